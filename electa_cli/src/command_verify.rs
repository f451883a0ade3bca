use electa::{Datatype, Election, EncryptedVote};

pub fn command_verify_ballot(matches: &clap::ArgMatches) {
    let election_file = matches.value_of("ELECTION").unwrap_or_else(|| {
        eprintln!("electa verify-ballot: election filename required");
        std::process::exit(1);
    });
    let vote_file = matches.value_of("VOTE").unwrap_or_else(|| {
        eprintln!("electa verify-ballot: vote filename required");
        std::process::exit(1);
    });

    let election: Election = match crate::read_datatype("verify-ballot", election_file).upgrade() {
        Datatype::Election(election) => election,
        other => {
            eprintln!(
                "electa verify-ballot: {} holds a {} record, not an election",
                election_file,
                other.tag()
            );
            std::process::exit(1);
        }
    };

    let vote: EncryptedVote = match crate::read_datatype("verify-ballot", vote_file).upgrade() {
        Datatype::EncryptedVote(vote) => vote,
        Datatype::CastVote(cast) => cast.vote,
        other => {
            eprintln!(
                "electa verify-ballot: {} holds a {} record, not a vote",
                vote_file,
                other.tag()
            );
            std::process::exit(1);
        }
    };

    match vote.verify(&election) {
        Ok(()) => {
            println!("> Ballot verified OK");
            println!("ballot-hash: {}", vote.hash());
        }
        Err(e) => {
            eprintln!("electa verify-ballot: {}", e);
            std::process::exit(1);
        }
    }
}
