pub fn command_params(matches: &clap::ArgMatches) {
    let params = crate::config(matches).params;

    if matches.is_present("validate") {
        if let Err(e) = params.validate() {
            eprintln!("electa params: {}", e);
            std::process::exit(1);
        }
        log::info!("group parameters are valid");
    }

    let params = serde_json::to_string_pretty(&params).unwrap_or_else(|e| {
        eprintln!("electa params: {}", e);
        std::process::exit(1);
    });
    println!("{}", params);
}
