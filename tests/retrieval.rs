//! End-to-end retrieval tests
//!
//! Tests the full pipeline: seal → set_value → query → answer → decode → open

use std::sync::Arc;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use mailbox_pir::envelope::{open_message, seal_message};
use mailbox_pir::params::{BfvParams, Row, MESSAGE_SIZE};
use mailbox_pir::pir::{Answer, PirClient, PirError, PirServer, Query};

/// Small ring: 256 slots per row half, so 456 columns spill into both halves
fn small_params() -> BfvParams {
    BfvParams::with_degree(512)
}

fn random_row(rng: &mut impl Rng) -> Row {
    let mut row = [0u8; MESSAGE_SIZE];
    rng.fill(&mut row[..]);
    row
}

fn fetch(server: &PirServer, client: &PirClient, index: usize, believed: usize) -> Row {
    let query = client.build_query(index, believed).unwrap();
    let answer = server.answer(&query).unwrap();
    client.decode(&answer, index).unwrap()
}

#[test]
fn test_hello_scenario() {
    let key = [0x42u8; 32];
    let server = PirServer::new(BfvParams::production()).unwrap();
    let client = PirClient::new(BfvParams::production()).unwrap();

    let index = server.allocate();
    assert_eq!(index, 0);
    assert_eq!(server.chunk_count(), 1);
    server
        .set_value(index, &seal_message(b"hello", &key).unwrap().row)
        .unwrap();

    let row = fetch(&server, &client, index, 1);
    assert_eq!(open_message(&row, &key).unwrap(), b"hello");
}

#[test]
fn test_every_slot_position() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();

    let rows = 1200;
    server.allocate_to(rows - 1);
    assert_eq!(server.chunk_count(), 3);

    // chunk edges, both slot halves, and the partial last chunk
    let targets = [0, 1, 255, 256, 300, 511, 512, 767, 768, 1023, 1024, 1199];
    let mut expected = Vec::new();
    for &index in &targets {
        let row = random_row(&mut rng);
        server.set_value(index, &row).unwrap();
        expected.push(row);
    }

    for (&index, row) in targets.iter().zip(&expected) {
        assert_eq!(
            &fetch(&server, &client, index, rows)[..],
            &row[..],
            "row {} mismatch",
            index
        );
    }
}

#[test]
fn test_unwritten_row_decodes_to_zero() {
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(600);
    server.set_value(5, &[0xFF; MESSAGE_SIZE]).unwrap();

    assert_eq!(fetch(&server, &client, 6, 601), [0u8; MESSAGE_SIZE]);
    assert_eq!(fetch(&server, &client, 600, 601), [0u8; MESSAGE_SIZE]);
}

#[test]
fn test_believed_rows_smaller_than_database() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(2000);

    let row = random_row(&mut rng);
    server.set_value(400, &row).unwrap();

    // a one-chunk query only ever looks at the first chunk
    let mut other = random_row(&mut rng);
    other[0] ^= 1;
    server.set_value(1500, &other).unwrap();

    assert_eq!(fetch(&server, &client, 400, 512), row);
    assert_eq!(fetch(&server, &client, 400, 2001), row);
}

#[test]
fn test_believed_rows_beyond_database_rejected() {
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(10);

    let query = client.build_query(3, 600).unwrap();
    assert!(matches!(
        server.answer(&query),
        Err(PirError::QueryTooLarge {
            query_chunks: 2,
            db_chunks: 1
        })
    ));
}

#[test]
fn test_answer_ignores_other_rows() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(1023);

    let target = random_row(&mut rng);
    server.set_value(700, &target).unwrap();
    let before = fetch(&server, &client, 700, 1024);

    for index in [0, 699, 701, 900] {
        server.set_value(index, &random_row(&mut rng)).unwrap();
    }
    let after = fetch(&server, &client, 700, 1024);

    assert_eq!(before, target);
    assert_eq!(after, target);
}

#[test]
fn test_query_built_before_write_sees_new_value() {
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(9);

    let query = client.build_query(9, 10).unwrap();
    server.set_value(9, &[0x5A; MESSAGE_SIZE]).unwrap();
    let answer = server.answer(&query).unwrap();

    assert_eq!(client.decode(&answer, 9).unwrap(), [0x5A; MESSAGE_SIZE]);
}

#[test]
fn test_outstanding_queries_all_decode() {
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(3);
    server.set_value(2, &[9; MESSAGE_SIZE]).unwrap();

    let first = client.build_query(2, 4).unwrap();
    let second = client.build_query(2, 4).unwrap();
    assert_ne!(
        first.to_bytes(client.context()).unwrap(),
        second.to_bytes(client.context()).unwrap()
    );

    let first_answer = server.answer(&first).unwrap();
    let second_answer = server.answer(&second).unwrap();

    // answers decode in any order, however many are in flight
    assert_eq!(client.decode(&second_answer, 2).unwrap(), [9; MESSAGE_SIZE]);
    assert_eq!(client.decode(&first_answer, 2).unwrap(), [9; MESSAGE_SIZE]);
    assert_eq!(client.decode(&second_answer, 2).unwrap(), [9; MESSAGE_SIZE]);
}

#[test]
fn test_answer_for_another_client_is_undecodable() {
    let server = PirServer::new(small_params()).unwrap();
    let alice = PirClient::new(small_params()).unwrap();
    let bob = PirClient::new(small_params()).unwrap();
    server.allocate_to(3);
    server.set_value(2, &[9; MESSAGE_SIZE]).unwrap();

    let answer = server.answer(&alice.build_query(2, 4).unwrap()).unwrap();
    assert!(matches!(bob.decode(&answer, 2), Err(PirError::Undecodable(2))));
    assert_eq!(alice.decode(&answer, 2).unwrap(), [9; MESSAGE_SIZE]);
}

#[test]
fn test_dummy_query_is_answered() {
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(600);

    let real = client.build_query(1, 601).unwrap();
    let dummy = client.build_dummy_query(601).unwrap();
    assert_eq!(real.chunk_count(), dummy.chunk_count());

    let ctx = client.context().clone();
    assert_eq!(
        real.to_bytes(&ctx).unwrap().len(),
        dummy.to_bytes(&ctx).unwrap().len()
    );
    assert!(server.answer(&dummy).is_ok());
}

#[test]
fn test_wire_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate_to(1000);
    let row = random_row(&mut rng);
    server.set_value(777, &row).unwrap();

    let query = client.build_query(777, 1001).unwrap();
    let query_bytes = query.to_bytes(client.context()).unwrap();
    let received = Query::from_bytes(server.context(), &query_bytes).unwrap();
    assert_eq!(received, query);

    let answer_bytes = server
        .answer(&received)
        .unwrap()
        .to_bytes(server.context())
        .unwrap();
    let answer = Answer::from_bytes(client.context(), &answer_bytes).unwrap();

    assert_eq!(client.decode(&answer, 777).unwrap(), row);
}

#[test]
fn test_truncated_bytes_rejected() {
    let server = PirServer::new(small_params()).unwrap();
    let client = PirClient::new(small_params()).unwrap();
    server.allocate();

    let query_bytes = client
        .build_query(0, 1)
        .unwrap()
        .to_bytes(client.context())
        .unwrap();
    for cut in [1, 100, query_bytes.len() / 2] {
        let truncated = &query_bytes[..query_bytes.len() - cut];
        assert!(matches!(
            Query::from_bytes(server.context(), truncated),
            Err(PirError::Malformed(_))
        ));
    }
    assert!(Query::from_bytes(server.context(), &[]).is_err());

    let answer_bytes = server
        .answer(&Query::from_bytes(server.context(), &query_bytes).unwrap())
        .unwrap()
        .to_bytes(server.context())
        .unwrap();
    assert!(matches!(
        Answer::from_bytes(client.context(), &answer_bytes[..answer_bytes.len() - 8]),
        Err(PirError::Malformed(_))
    ));

    let mut padded = answer_bytes.clone();
    padded.push(0);
    assert!(matches!(
        Answer::from_bytes(client.context(), &padded),
        Err(PirError::Malformed(_))
    ));
}

#[test]
fn test_parameter_mismatch_rejected() {
    let client = PirClient::new(small_params()).unwrap();
    let server = PirServer::new(BfvParams::with_degree(1024)).unwrap();

    let query_bytes = client
        .build_query(0, 1)
        .unwrap()
        .to_bytes(client.context())
        .unwrap();
    assert!(matches!(
        Query::from_bytes(server.context(), &query_bytes),
        Err(PirError::ParameterMismatch { .. })
    ));

    // the same mismatch in memory fails cleanly instead of reaching the NTT
    let query = client.build_query(0, 1).unwrap();
    server.allocate();
    assert!(matches!(server.answer(&query), Err(PirError::Malformed(_))));

    let other = PirClient::new(BfvParams::with_degree(1024)).unwrap();
    let answer = server.answer(&other.build_query(0, 1).unwrap()).unwrap();
    assert!(matches!(client.decode(&answer, 0), Err(PirError::Malformed(_))));
}

#[test]
fn test_concurrent_reads_and_writes() {
    let server = Arc::new(PirServer::new(small_params()).unwrap());
    server.allocate_to(511);

    let old = [0xAAu8; MESSAGE_SIZE];
    let new = [0xBBu8; MESSAGE_SIZE];
    server.set_value(42, &old).unwrap();

    let writer = {
        let server = Arc::clone(&server);
        thread::spawn(move || {
            for round in 0..6 {
                let value = if round % 2 == 0 { &new } else { &old };
                server.set_value(42, value).unwrap();
                server.allocate();
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                let client = PirClient::new(small_params()).unwrap();
                for _ in 0..3 {
                    let row = fetch(&server, &client, 42, 512);
                    assert!(row == old || row == new, "observed a torn row");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(server.row_count(), 518);
    assert_eq!(server.chunk_count(), 2);
    assert_eq!(server.get_value(42).unwrap(), old);
}
