//! # Property Tests over Random Operation Sequences
//!
//! After every operation of an arbitrary sequence:
//! - a rejected write leaves the state root and the journal unchanged,
//! - an accepted write appends exactly one event,
//! - every batch keeps equal-length, non-empty histories,
//! - no batch's stage ever decreases,
//! - each external code keeps resolving to the batch that claimed it,
//! - ledger-held balances equal the value settled so far.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use agri_core::{
    BatchId, Centi, ManualClock, Principal, ProductId, QualityGrade, Role, Stage, Timestamp,
    TransactionId,
};
use agri_ledger::{Ledger, LedgerConfig, NewProduct};

const ACTORS: [&str; 4] = ["farm", "dist", "shop", "ghost"];
const GRADES: [QualityGrade; 4] = [
    QualityGrade::Excellent,
    QualityGrade::Good,
    QualityGrade::Fair,
    QualityGrade::Poor,
];

#[derive(Debug, Clone)]
enum Op {
    Transfer { caller: usize, batch: u64, to: usize, stage: u8, location: bool },
    Note { caller: usize, batch: u64, empty: bool },
    Record { caller: usize, batch: u64, temperature: i64 },
    Quality { caller: usize, batch: u64, grade: usize },
    Open { caller: usize, batch: u64, buyer: usize, price: u64 },
    Complete { caller: usize, tx: u64, payment: u64 },
    Deactivate { who: usize },
    Tick { secs: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let actor = 0..ACTORS.len();
    let batch = 0u64..4;
    prop_oneof![
        4 => (actor.clone(), batch.clone(), actor.clone(), 0u8..5, any::<bool>())
            .prop_map(|(caller, batch, to, stage, location)| Op::Transfer { caller, batch, to, stage, location }),
        2 => (actor.clone(), batch.clone(), any::<bool>())
            .prop_map(|(caller, batch, empty)| Op::Note { caller, batch, empty }),
        2 => (actor.clone(), batch.clone(), -4_000i64..6_000)
            .prop_map(|(caller, batch, temperature)| Op::Record { caller, batch, temperature }),
        1 => (actor.clone(), batch.clone(), 0..GRADES.len())
            .prop_map(|(caller, batch, grade)| Op::Quality { caller, batch, grade }),
        3 => (actor.clone(), batch.clone(), actor.clone(), 0u64..200)
            .prop_map(|(caller, batch, buyer, price)| Op::Open { caller, batch, buyer, price }),
        3 => (actor.clone(), 0u64..5, 0u64..300)
            .prop_map(|(caller, tx, payment)| Op::Complete { caller, tx, payment }),
        1 => (0..ACTORS.len()).prop_map(|who| Op::Deactivate { who }),
        1 => (0i64..3_600).prop_map(|secs| Op::Tick { secs }),
    ]
}

fn p(key: &str) -> Principal {
    Principal::new(key).unwrap()
}

fn seeded() -> (Ledger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(
        Timestamp::parse("2026-05-01T00:00:00Z").unwrap(),
    ));
    let ledger = Ledger::new(
        LedgerConfig::default().with_administrator(p("admin")),
        clock.clone(),
    );
    ledger.register(&p("farm"), "Farm", "Field", Role::Producer).unwrap();
    ledger.register(&p("dist"), "Dist", "Depot", Role::Distributor).unwrap();
    ledger.register(&p("shop"), "Shop", "Town", Role::Retailer).unwrap();
    ledger
        .create_product(
            &p("farm"),
            NewProduct {
                name: "Carrots".into(),
                variety: "Nantes".into(),
                quantity: 300,
                harvest_date: "2026-04-30".into(),
                organic: true,
                certifications: Default::default(),
            },
        )
        .unwrap();
    ledger.create_batch(&p("farm"), ProductId(1), "C-1", "Field").unwrap();
    ledger.create_batch(&p("farm"), ProductId(1), "C-2", "Field").unwrap();
    (ledger, clock)
}

/// Apply one op; returns the value it settled, if it was a settlement.
fn apply(ledger: &Ledger, clock: &ManualClock, op: &Op) -> Result<u64, agri_core::LedgerError> {
    match *op {
        Op::Transfer { caller, batch, to, stage, location } => {
            let stage = Stage::from_value(stage).unwrap();
            let location = if location { "Depot" } else { "" };
            ledger
                .transfer_ownership(&p(ACTORS[caller]), BatchId(batch), &p(ACTORS[to]), stage, location)
                .map(|()| 0)
        }
        Op::Note { caller, batch, empty } => ledger
            .add_note(&p(ACTORS[caller]), BatchId(batch), if empty { "" } else { "checked" })
            .map(|()| 0),
        Op::Record { caller, batch, temperature } => ledger
            .record_provenance(&p(ACTORS[caller]), BatchId(batch), Centi(temperature), Centi(5_000), "Depot", "")
            .map(|_| 0),
        Op::Quality { caller, batch, grade } => ledger
            .update_quality(&p(ACTORS[caller]), BatchId(batch), GRADES[grade], "inspection")
            .map(|()| 0),
        Op::Open { caller, batch, buyer, price } => ledger
            .create_transaction(&p(ACTORS[caller]), BatchId(batch), &p(ACTORS[buyer]), price, "sale")
            .map(|_| 0),
        Op::Complete { caller, tx, payment } => ledger
            .complete_transaction(&p(ACTORS[caller]), TransactionId(tx), payment)
            .map(|s| s.price + s.refund),
        Op::Deactivate { who } => ledger.deactivate(&p("admin"), &p(ACTORS[who])).map(|()| 0),
        Op::Tick { secs } => {
            clock.advance(secs);
            Ok(0)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ledger_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (ledger, clock) = seeded();
        let mut stages: BTreeMap<BatchId, Stage> = BTreeMap::new();
        let mut settled: u64 = 0;

        for op in &ops {
            let root = ledger.state_root().unwrap();
            let events = ledger.journal().len();

            match apply(&ledger, &clock, op) {
                Ok(value) => {
                    settled += value;
                    let expected = if matches!(op, Op::Tick { .. }) { events } else { events + 1 };
                    prop_assert_eq!(ledger.journal().len(), expected);
                }
                Err(_) => {
                    prop_assert_eq!(ledger.state_root().unwrap(), root);
                    prop_assert_eq!(ledger.journal().len(), events);
                }
            }

            let snapshot = ledger.snapshot();
            prop_assert!(snapshot.histories_consistent());
            for batch in snapshot.batches.iter() {
                let previous = stages.insert(batch.id(), batch.stage());
                if let Some(previous) = previous {
                    prop_assert!(batch.stage() >= previous);
                }
            }
            prop_assert_eq!(ledger.batch_id_by_code("C-1"), Some(BatchId(1)));
            prop_assert_eq!(ledger.batch_id_by_code("C-2"), Some(BatchId(2)));
            prop_assert_eq!(snapshot.balances.total(), Some(settled));
        }

        prop_assert!(ledger.verify_journal().is_ok());
    }

    #[test]
    fn rejected_transfer_leaves_snapshot_identical(stage in 0u8..5) {
        let (ledger, _) = seeded();
        ledger
            .transfer_ownership(&p("farm"), BatchId(1), &p("dist"), Stage::Delivered, "Depot")
            .unwrap();
        let before = ledger.snapshot();
        let target = Stage::from_value(stage).unwrap();
        let result = ledger.transfer_ownership(&p("dist"), BatchId(1), &p("shop"), target, "Town");
        if target <= Stage::Delivered {
            prop_assert!(result.is_err());
            prop_assert_eq!(ledger.snapshot(), before);
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(ledger.batch(BatchId(1)).unwrap().history_len(), 3);
        }
    }
}
