//! Randomized properties: round trips, weight accounting, code-length
//! ordering, and structural invariants after every single operation.

use huffstream::{AdaptiveTree, BitBuffer, CodecConfig, Decoded};
use proptest::prelude::*;

fn audited() -> CodecConfig {
    CodecConfig::new().with_exhaustive_checks()
}

proptest! {
    #[test]
    fn random_streams_round_trip(
        stream in proptest::collection::vec(0u64..24, 0..200),
    ) {
        let mut sink = BitBuffer::new();
        let mut encoder: AdaptiveTree<u64> = AdaptiveTree::with_config(&audited());
        for value in &stream {
            encoder.encode(Some(value), &mut sink).unwrap();
        }
        encoder.encode(None, &mut sink).unwrap();

        // Root weight counts every processed symbol, end marker included.
        prop_assert_eq!(encoder.symbols_processed(), stream.len() as u64 + 1);

        let mut decoder: AdaptiveTree<u64> = AdaptiveTree::with_config(&audited());
        let mut source = sink.reader();
        let mut decoded = Vec::new();
        loop {
            match decoder.decode(&mut source).unwrap() {
                Decoded::Symbol(value) => decoded.push(value),
                Decoded::End => break,
            }
        }

        prop_assert_eq!(&decoded, &stream);
        // Perfect symmetry: the decoder consumes exactly the bits the
        // encoder produced, and its escaped end marker adds no growth.
        prop_assert_eq!(source.remaining(), 0);
        prop_assert_eq!(decoder.symbols_processed(), stream.len() as u64);
    }

    #[test]
    fn byte_streams_round_trip(
        data in proptest::collection::vec(any::<u8>(), 0..300),
    ) {
        let mut sink = BitBuffer::new();
        let mut encoder: AdaptiveTree<u8> = AdaptiveTree::with_config(&audited());
        for byte in &data {
            encoder.encode(Some(byte), &mut sink).unwrap();
        }
        encoder.encode(None, &mut sink).unwrap();

        let mut decoder: AdaptiveTree<u8> = AdaptiveTree::with_config(&audited());
        let mut source = sink.reader();
        let mut decoded = Vec::new();
        loop {
            match decoder.decode(&mut source).unwrap() {
                Decoded::Symbol(byte) => decoded.push(byte),
                Decoded::End => break,
            }
        }
        prop_assert_eq!(decoded, data);
    }

    #[test]
    fn code_lengths_follow_frequencies(
        stream in proptest::collection::vec(0u64..8, 1..300),
    ) {
        let mut sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::with_config(&audited());
        for value in &stream {
            tree.encode(Some(value), &mut sink).unwrap();
        }

        let profile = tree.code_profile();
        for (i, &(weight_a, depth_a)) in profile.iter().enumerate() {
            for &(weight_b, depth_b) in &profile[i + 1..] {
                if weight_a < weight_b {
                    prop_assert!(
                        depth_a >= depth_b,
                        "leaf seen {} times has code length {}, but a leaf \
                         seen {} times has code length {}",
                        weight_a, depth_a, weight_b, depth_b,
                    );
                }
                if weight_b < weight_a {
                    prop_assert!(depth_b >= depth_a);
                }
            }
        }
    }

    #[test]
    fn trees_stay_valid_under_interleaved_repeats(
        seed in proptest::collection::vec(0u64..6, 1..40),
        repeats in 1usize..4,
    ) {
        // Stress the updater with heavy repetition of a tiny alphabet;
        // every encode runs the full structural audit.
        let mut sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::with_config(&audited());
        for value in &seed {
            for _ in 0..repeats {
                tree.encode(Some(value), &mut sink).unwrap();
            }
        }
        prop_assert_eq!(
            tree.symbols_processed(),
            (seed.len() * repeats) as u64
        );
        prop_assert!(tree.check_invariants().is_ok());
    }
}
