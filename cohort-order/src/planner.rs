use cohort_catalog::{Availability, BundleDefinition, ResolvedBundle};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{EventRegistrationEntry, SkipReason, SkippedEventEntry};

/// What happens to one bundle member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecision {
    Register,
    Replace(Uuid),
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSlot {
    pub original_event_id: Uuid,
    pub decision: SlotDecision,
}

impl PlannedSlot {
    /// The event that needs a seat for this slot, if any.
    pub fn claimed_event_id(&self) -> Option<Uuid> {
        match self.decision {
            SlotDecision::Register => Some(self.original_event_id),
            SlotDecision::Replace(replacement) => Some(replacement),
            SlotDecision::Skip(_) => None,
        }
    }
}

/// Per-member decisions in the bundle's declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentPlan {
    pub slots: Vec<PlannedSlot>,
}

impl FulfillmentPlan {
    pub fn claims(&self) -> Vec<Uuid> {
        self.slots.iter().filter_map(PlannedSlot::claimed_event_id).collect()
    }

    pub fn event_registrations(&self) -> Vec<EventRegistrationEntry> {
        self.slots
            .iter()
            .filter_map(|slot| match slot.decision {
                SlotDecision::Register => Some(EventRegistrationEntry::registered(slot.original_event_id)),
                SlotDecision::Replace(replacement) => {
                    Some(EventRegistrationEntry::replaced(slot.original_event_id, replacement))
                }
                SlotDecision::Skip(_) => None,
            })
            .collect()
    }

    pub fn skipped_events(&self) -> Vec<SkippedEventEntry> {
        self.slots
            .iter()
            .filter_map(|slot| match slot.decision {
                SlotDecision::Skip(reason) => Some(SkippedEventEntry {
                    original_event_id: slot.original_event_id,
                    reason,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Decides register / replace / skip for every member of a bundle.
pub struct FulfillmentPlanner;

impl FulfillmentPlanner {
    pub fn plan(bundle: &ResolvedBundle) -> Result<FulfillmentPlan, PlanningFault> {
        let mut consumed = HashSet::new();
        let slots = bundle
            .definition
            .event_ids
            .iter()
            .map(|original| Self::decide(bundle, *original, &mut consumed))
            .collect();

        let plan = FulfillmentPlan { slots };
        Self::verify(&bundle.definition, &plan)?;
        Ok(plan)
    }

    /// Re-decide only the slots whose claimed event hit a capacity conflict.
    /// Replacements held by untouched slots stay reserved for them.
    pub fn replan(
        bundle: &ResolvedBundle,
        previous: &FulfillmentPlan,
        conflicted: &[Uuid],
    ) -> Result<FulfillmentPlan, PlanningFault> {
        let hit = |slot: &PlannedSlot| {
            slot.claimed_event_id()
                .is_some_and(|id| conflicted.contains(&id))
        };

        let mut consumed: HashSet<Uuid> = previous
            .slots
            .iter()
            .filter(|slot| !hit(*slot))
            .filter_map(|slot| match slot.decision {
                SlotDecision::Replace(replacement) => Some(replacement),
                _ => None,
            })
            .collect();

        let slots = previous
            .slots
            .iter()
            .map(|slot| {
                if hit(slot) {
                    Self::decide(bundle, slot.original_event_id, &mut consumed)
                } else {
                    slot.clone()
                }
            })
            .collect();

        let plan = FulfillmentPlan { slots };
        Self::verify(&bundle.definition, &plan)?;
        Ok(plan)
    }

    fn decide(bundle: &ResolvedBundle, original: Uuid, consumed: &mut HashSet<Uuid>) -> PlannedSlot {
        let availability = bundle.availability(&original);
        let Some(original_reason) = SkipReason::for_availability(availability) else {
            return PlannedSlot {
                original_event_id: original,
                decision: SlotDecision::Register,
            };
        };

        let pool = &bundle.definition.replacement_event_ids;
        let replacement = pool
            .iter()
            .filter(|id| !consumed.contains(*id))
            .find(|id| bundle.availability(id) == Availability::Active)
            .copied();

        let decision = match replacement {
            Some(replacement) => {
                consumed.insert(replacement);
                SlotDecision::Replace(replacement)
            }
            None if pool.is_empty() => SlotDecision::Skip(original_reason),
            None => SlotDecision::Skip(SkipReason::NoReplacementAvailable),
        };

        PlannedSlot {
            original_event_id: original,
            decision,
        }
    }

    /// Every member accounted for exactly once, in order, and no replacement
    /// covers two members.
    pub fn verify(definition: &BundleDefinition, plan: &FulfillmentPlan) -> Result<(), PlanningFault> {
        let originals: Vec<Uuid> = plan.slots.iter().map(|s| s.original_event_id).collect();
        if originals != definition.event_ids {
            return Err(PlanningFault::CoverageMismatch {
                expected: definition.event_ids.len(),
                planned: originals.len(),
            });
        }

        let mut used = HashSet::new();
        for slot in &plan.slots {
            if let SlotDecision::Replace(replacement) = slot.decision {
                if !definition.replacement_event_ids.contains(&replacement) {
                    return Err(PlanningFault::ForeignReplacement(replacement));
                }
                if !used.insert(replacement) {
                    return Err(PlanningFault::ReplacementReused(replacement));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlanningFault {
    #[error("plan covers {planned} members, bundle declares {expected}")]
    CoverageMismatch { expected: usize, planned: usize },

    #[error("replacement {0} is used by more than one member")]
    ReplacementReused(Uuid),

    #[error("replacement {0} is not in the bundle's pool")]
    ForeignReplacement(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cohort_catalog::{BundleStatus, EventRecord, EventStatus};
    use std::collections::HashMap;

    fn event(status: EventStatus, capacity: u32, registered_count: u32) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            title: "Navigation day".to_string(),
            date: Utc::now(),
            location: "Golan".to_string(),
            capacity,
            price_nis: 90,
            lifecycle_status: status,
            registered_count,
        }
    }

    fn resolve(members: &[&EventRecord], pool: &[&EventRecord]) -> ResolvedBundle {
        let definition = BundleDefinition {
            id: Uuid::new_v4(),
            title: "Field skills".to_string(),
            description: None,
            price_nis: 100,
            event_ids: members.iter().map(|e| e.id).collect(),
            replacement_event_ids: pool.iter().map(|e| e.id).collect(),
            valid_until: None,
            publish: true,
            lifecycle_status: BundleStatus::Active,
            created_at: Utc::now(),
        };
        let events: HashMap<Uuid, EventRecord> = members
            .iter()
            .chain(pool.iter())
            .map(|e| (e.id, (*e).clone()))
            .collect();
        ResolvedBundle { definition, events }
    }

    #[test]
    fn full_member_without_pool_is_skipped_as_full() {
        let e1 = event(EventStatus::Active, 10, 3);
        let e2 = event(EventStatus::Active, 10, 10);
        let plan = FulfillmentPlanner::plan(&resolve(&[&e1, &e2], &[])).unwrap();

        assert_eq!(plan.event_registrations(), vec![EventRegistrationEntry::registered(e1.id)]);
        assert_eq!(
            plan.skipped_events(),
            vec![SkippedEventEntry { original_event_id: e2.id, reason: SkipReason::Full }]
        );
        assert_eq!(plan.claims(), vec![e1.id]);
    }

    #[test]
    fn cancelled_member_takes_first_active_replacement() {
        let e1 = event(EventStatus::Cancelled, 10, 0);
        let full_spare = event(EventStatus::Active, 4, 4);
        let spare = event(EventStatus::Active, 4, 0);
        let plan = FulfillmentPlanner::plan(&resolve(&[&e1], &[&full_spare, &spare])).unwrap();

        assert_eq!(plan.event_registrations(), vec![EventRegistrationEntry::replaced(e1.id, spare.id)]);
        assert!(plan.skipped_events().is_empty());
    }

    #[test]
    fn one_replacement_never_covers_two_members() {
        let e1 = event(EventStatus::Completed, 10, 0);
        let e2 = event(EventStatus::Active, 5, 5);
        let spare = event(EventStatus::Active, 50, 0);
        let plan = FulfillmentPlanner::plan(&resolve(&[&e1, &e2], &[&spare])).unwrap();

        assert_eq!(plan.event_registrations(), vec![EventRegistrationEntry::replaced(e1.id, spare.id)]);
        assert_eq!(
            plan.skipped_events(),
            vec![SkippedEventEntry {
                original_event_id: e2.id,
                reason: SkipReason::NoReplacementAvailable
            }]
        );
    }

    #[test]
    fn missing_and_draft_members_count_as_cancelled() {
        let draft = event(EventStatus::Draft, 10, 0);
        let ghost = event(EventStatus::Active, 10, 0);
        let mut bundle = resolve(&[&draft, &ghost], &[]);
        bundle.events.remove(&ghost.id);

        let plan = FulfillmentPlanner::plan(&bundle).unwrap();
        let reasons: Vec<SkipReason> = plan.skipped_events().iter().map(|s| s.reason).collect();
        assert_eq!(reasons, vec![SkipReason::Cancelled, SkipReason::Cancelled]);
    }

    #[test]
    fn every_member_is_accounted_for_once() {
        let members: Vec<EventRecord> = vec![
            event(EventStatus::Active, 3, 0),
            event(EventStatus::Active, 3, 3),
            event(EventStatus::Cancelled, 3, 0),
            event(EventStatus::Completed, 3, 0),
            event(EventStatus::Draft, 3, 0),
        ];
        let pool: Vec<EventRecord> = vec![event(EventStatus::Active, 1, 0), event(EventStatus::Active, 9, 9)];
        let member_refs: Vec<&EventRecord> = members.iter().collect();
        let pool_refs: Vec<&EventRecord> = pool.iter().collect();
        let bundle = resolve(&member_refs, &pool_refs);

        let plan = FulfillmentPlanner::plan(&bundle).unwrap();
        let mut covered: Vec<Uuid> = plan
            .event_registrations()
            .iter()
            .map(|e| e.event_id)
            .chain(plan.skipped_events().iter().map(|s| s.original_event_id))
            .collect();
        covered.sort();
        let mut expected = bundle.definition.event_ids.clone();
        expected.sort();
        assert_eq!(covered, expected);

        let replacements: Vec<Uuid> = plan
            .event_registrations()
            .iter()
            .filter_map(|e| e.replacement_event_id)
            .collect();
        let unique: HashSet<Uuid> = replacements.iter().copied().collect();
        assert_eq!(unique.len(), replacements.len());
    }

    #[test]
    fn replan_only_redecides_conflicted_slots() {
        let e1 = event(EventStatus::Active, 1, 0);
        let e2 = event(EventStatus::Cancelled, 1, 0);
        let spare_a = event(EventStatus::Active, 1, 0);
        let spare_b = event(EventStatus::Active, 1, 0);
        let mut bundle = resolve(&[&e1, &e2], &[&spare_a, &spare_b]);

        let plan = FulfillmentPlanner::plan(&bundle).unwrap();
        assert_eq!(plan.claims(), vec![e1.id, spare_a.id]);

        // Someone else took the last seat on e1 in the meantime.
        bundle.events.get_mut(&e1.id).unwrap().registered_count = 1;
        let replanned = FulfillmentPlanner::replan(&bundle, &plan, &[e1.id]).unwrap();

        assert_eq!(
            replanned.event_registrations(),
            vec![
                EventRegistrationEntry::replaced(e1.id, spare_b.id),
                EventRegistrationEntry::replaced(e2.id, spare_a.id),
            ]
        );
    }

    #[test]
    fn verify_rejects_reused_replacement() {
        let e1 = event(EventStatus::Cancelled, 1, 0);
        let e2 = event(EventStatus::Cancelled, 1, 0);
        let spare = event(EventStatus::Active, 5, 0);
        let bundle = resolve(&[&e1, &e2], &[&spare]);

        let broken = FulfillmentPlan {
            slots: vec![
                PlannedSlot { original_event_id: e1.id, decision: SlotDecision::Replace(spare.id) },
                PlannedSlot { original_event_id: e2.id, decision: SlotDecision::Replace(spare.id) },
            ],
        };
        assert_eq!(
            FulfillmentPlanner::verify(&bundle.definition, &broken),
            Err(PlanningFault::ReplacementReused(spare.id))
        );

        let short = FulfillmentPlan { slots: broken.slots[..1].to_vec() };
        assert!(matches!(
            FulfillmentPlanner::verify(&bundle.definition, &short),
            Err(PlanningFault::CoverageMismatch { .. })
        ));
    }
}
