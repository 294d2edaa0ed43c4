//! Properties that must hold across the whole fork history

use proptest::prelude::*;
use tessera_forks::{Fork, IntrinsicGasInput, Opcode};

fn fork_strategy() -> impl Strategy<Value = Fork> {
    (0..Fork::ALL.len()).prop_map(|i| Fork::ALL[i])
}

#[test]
fn test_opcodes_only_disappear_through_explicit_deprecation() {
    for pair in Fork::ALL.windows(2) {
        let (older, newer) = (pair[0], pair[1]);
        let newer_set = newer.valid_opcodes();
        for op in older.valid_opcodes() {
            if !newer_set.contains(&op) {
                assert!(
                    newer.deprecated_opcodes().contains(&op),
                    "{:?} dropped by {} without deprecation",
                    op,
                    newer
                );
            }
        }
    }
}

#[test]
fn test_tx_types_precompiles_and_header_fields_only_grow() {
    for pair in Fork::ALL.windows(2) {
        let (older, newer) = (pair[0], pair[1]);
        assert!(older.tx_types().is_subset(&newer.tx_types()));
        assert!(older.precompiles().is_subset(&newer.precompiles()));
        assert!(older.header_fields().is_subset(&newer.header_fields()));
    }
}

#[test]
fn test_capability_queries_are_pure() {
    for f in Fork::ALL {
        assert_eq!(f.valid_opcodes(), f.valid_opcodes());
        assert_eq!(f.gas_costs(), f.gas_costs());
        assert_eq!(f.blob_schedule(), f.blob_schedule());
    }
}

proptest! {
    #[test]
    fn prop_opcode_validity_is_monotonic(a in fork_strategy(), b in fork_strategy(), byte in any::<u8>()) {
        let (older, newer) = if a <= b { (a, b) } else { (b, a) };
        if let Some(op) = Opcode::from_byte(byte) {
            let deprecated_between = Fork::ALL
                .iter()
                .filter(|f| **f > older && **f <= newer)
                .any(|f| f.deprecated_opcodes().contains(&op));
            if older.is_opcode_valid(op) && !deprecated_between {
                prop_assert!(newer.is_opcode_valid(op));
            }
        }
    }

    #[test]
    fn prop_intrinsic_gas_grows_with_calldata(fork in fork_strategy(), data in proptest::collection::vec(any::<u8>(), 0..256), extra in any::<u8>()) {
        let base = fork.intrinsic_gas(&IntrinsicGasInput { calldata: &data, ..Default::default() });
        let mut longer = data.clone();
        longer.push(extra);
        let grown = fork.intrinsic_gas(&IntrinsicGasInput { calldata: &longer, ..Default::default() });
        prop_assert!(grown.required() > base.required());
        prop_assert!(base.required() >= 21_000);
    }
}
