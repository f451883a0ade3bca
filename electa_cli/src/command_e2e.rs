use electa::*;
use futures::executor::block_on;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

fn fail<E: std::fmt::Display>(e: E) -> ! {
    eprintln!("electa e2e: {}", e);
    std::process::exit(1)
}

fn parse_count(matches: &clap::ArgMatches, name: &str) -> usize {
    let value = matches.value_of(name).unwrap_or("0");
    value
        .parse()
        .unwrap_or_else(|_| fail(format!("--{} must be a number, got {}", name, value)))
}

pub fn command_e2e(matches: &clap::ArgMatches) {
    let mut rng = rand::thread_rng();
    let num_voters = parse_count(matches, "voters");
    let num_trustees = parse_count(matches, "trustees");
    let answers_arg = crate::expand(matches.value_of("answers").unwrap_or("Alice,Bob,Carol"));
    let answers: Vec<&str> = answers_arg.split(',').map(|a| a.trim()).collect();

    let config = crate::config(matches);
    let service = Arc::new(ElectionService::new(MemStore::default(), config).unwrap_or_else(|e| fail(e)));

    // Set up the election
    let election = service
        .create_election("e2e", "End to end demonstration")
        .unwrap_or_else(|e| fail(e));
    let election_id = election.uuid;

    let trustees: Vec<(Uuid, PrivateKey)> = service
        .update_election(election_id, |e| {
            e.add_question(Question::new("q1", "Who should win?", &answers).with_bounds(0, Some(1)))?;
            e.set_openreg(true)?;

            let mut rng = rand::thread_rng();
            let mut trustees = Vec::with_capacity(num_trustees);
            for i in 0..num_trustees {
                let id = e.add_trustee(Trustee::new(
                    &format!("Trustee {}", i + 1),
                    &format!("trustee{}@electa.invalid", i + 1),
                ))?;
                trustees.push((id, e.generate_trustee_key(id, &mut rng)?));
            }
            Ok(trustees)
        })
        .unwrap_or_else(|e| fail(e));

    service.freeze(election_id).unwrap_or_else(|e| fail(e));
    let election = service.get_election(election_id).unwrap_or_else(|e| fail(e));
    println!("> Election {} frozen", election_id);
    println!("  election-hash: {}", election.election_hash.clone().unwrap_or_default());

    // Vote
    for i in 0..num_voters {
        let choice = rng.gen_range(0..answers.len());
        let (vote, _) =
            EncryptedVote::encrypt(&election, &[vec![choice]], &mut rng).unwrap_or_else(|e| fail(e));
        let payload = Datatype::EncryptedVote(vote).as_bytes();
        let receipt = service
            .cast_ballot(election_id, &format!("voter-{}", i + 1), &payload)
            .unwrap_or_else(|e| fail(e));
        log::info!("voter-{} cast {}", i + 1, receipt.ballot_hash);
    }
    println!("> {} ballots cast", num_voters);

    // Tally
    let mut state = block_on(service.spawn_compute_tally(&ThreadExecutor, election_id))
        .unwrap_or_else(|e| fail(e));
    println!("> Tally computed, election is {}", state);

    // Decrypt
    let election = service.get_election(election_id).unwrap_or_else(|e| fail(e));
    let ctx = election
        .proof_context()
        .unwrap_or_else(|| fail("election has no public key"));
    let tally = election
        .encrypted_tally
        .as_ref()
        .unwrap_or_else(|| fail("election has no tally"));
    for (trustee_id, secret) in &trustees {
        let trustee = election
            .trustee(*trustee_id)
            .unwrap_or_else(|| fail(Error::TrusteeDoesNotExist(*trustee_id)));
        let partial = trustee
            .partial_decrypt(&ctx, tally, secret, &mut rng)
            .unwrap_or_else(|e| fail(e));
        state = service
            .submit_decryption_factor(election_id, *trustee_id, partial)
            .unwrap_or_else(|e| fail(e));
        println!("> {} submitted a decryption", trustee.name);
    }

    if state != ElectionState::Decrypted {
        fail(format!("election is {} after every trustee decrypted", state));
    }

    service.release_result(election_id).unwrap_or_else(|e| fail(e));
    let result = service.get_result(election_id).unwrap_or_else(|e| fail(e));

    println!("Results:");
    for (answer, count) in answers.iter().zip(&result[0]) {
        println!("  {} got {} votes", answer, count);
    }
}
