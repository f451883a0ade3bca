pub fn command_inspect(matches: &clap::ArgMatches) {
    let filename = matches.value_of("INPUT").unwrap_or_else(|| {
        eprintln!("electa inspect: input filename required");
        std::process::exit(1);
    });

    let mut record = crate::read_datatype("inspect", filename);
    if record.is_legacy() {
        log::warn!("{} is a legacy {} record", filename, record.tag());
        if matches.is_present("upgrade") {
            record = record.upgrade();
        }
    }

    let json: serde_json::Value = serde_json::from_str(&record.to_json()).unwrap_or_else(|e| {
        eprintln!("electa inspect: {}", e);
        std::process::exit(1);
    });
    let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
        eprintln!("electa inspect: {}", e);
        std::process::exit(1);
    });

    println!("{}", pretty);
}
