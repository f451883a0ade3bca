use electa::{generate_keypair, Datatype, ElGamalPublicKey};

pub fn command_keygen(matches: &clap::ArgMatches) {
    let params = crate::config(matches).params;
    let mut rng = rand::thread_rng();

    let (public, secret) = generate_keypair(&params, &mut rng);
    let pok = secret.prove_possession(&params, &mut rng);

    println!("secret-key: {}", secret.x);
    println!("public-key-hash: {}", public.fingerprint());
    println!("public-key: {}", Datatype::PublicKey(ElGamalPublicKey::new(&params, &public)).to_json());
    println!("pok: {}", Datatype::DLogProof(pok).to_json());
}
