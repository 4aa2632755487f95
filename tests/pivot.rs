//! Agreement properties of the distributed pivot selection.

use cubesort::median;
use cubesort::{LexicalOrder, Payload, RandomBitStore};
use cubesort_communication::{initialize, Communicator, Configuration};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn every_rank_receives_the_same_pivot() {
    let guards = initialize(Configuration::Process(8), |mut comm| {
        let rank = comm.rank();
        // Sorted, pairwise-distinct local candidates; seeds differ per rank on purpose.
        let mut rng = StdRng::seed_from_u64(4000 + rank as u64);
        let mut bits = RandomBitStore::new();
        let mut data = Payload::<()>::new();
        for item in 0..5 {
            data.push_str(format!("r{}-{}", rank, item).as_bytes(), ());
        }
        let buffer = data.into_buffer();
        let pivot = median::select_pivot(&mut rng, &mut bits, &buffer, LexicalOrder, 20, &mut comm);
        (pivot.size(), pivot.raw_strings().to_vec())
    })
    .unwrap();

    let results: Vec<(usize, Vec<u8>)> = guards.join().into_iter().map(Result::unwrap).collect();
    let (size, bytes) = &results[0];
    assert_eq!(*size, 1);
    assert!(!bytes.is_empty());
    for other in &results {
        assert_eq!(other, &results[0], "ranks disagree on the pivot");
    }
}

#[test]
fn an_empty_group_agrees_on_no_pivot() {
    let guards = initialize(Configuration::Process(4), |mut comm| {
        let mut rng = StdRng::seed_from_u64(4100 + comm.rank() as u64);
        let mut bits = RandomBitStore::new();
        let buffer = Payload::<()>::new().into_buffer();
        let pivot = median::select_pivot(&mut rng, &mut bits, &buffer, LexicalOrder, 21, &mut comm);
        pivot.size()
    })
    .unwrap();

    for result in guards.join() {
        assert_eq!(result.unwrap(), 0);
    }
}
