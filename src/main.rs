use anyhow::{anyhow, Context, Result};
use is_terminal::IsTerminal;
use metacrab::{ClientInfo, Config, DynRecord, Plugins, Shared};
use std::net::IpAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_init();

    let mut args = std::env::args();
    let program_name = args.next().unwrap_or("metacrab".to_string());
    let config_file = args.next();
    let query = args.next().zip(args.next());

    let config = config_init(&program_name, config_file)?;
    let plugins = Plugins::load(config.plugins.clone())?;
    let records = DynRecord::bind_all(&config, &plugins)?;
    config.apply_admin_state(plugins.monitors())?;
    tracing::info!("bound {} records", records.len());

    let Some((record_name, client)) = query else {
        return Ok(());
    };
    let client: IpAddr = client
        .parse()
        .with_context(|| format!("invalid client address '{client}'"))?;
    let origin = config.origin()?;
    let record = records
        .iter()
        .find(|r| {
            r.name.to_string() == record_name
                || r.name.to_string() == format!("{record_name}.{origin}")
        })
        .ok_or_else(|| anyhow!("no record named '{record_name}'"))?;

    let answer = record.resolve(&plugins, 0, &ClientInfo::new(client));
    println!(
        "{} {} ttl={} scope=/{}",
        record.name,
        answer.state,
        answer.ttl,
        answer.result.scope_mask()
    );
    if let Some(cname) = answer.result.cname() {
        println!("  CNAME {cname}");
    }
    for addr in answer.result.addrs() {
        let rtype = if addr.is_ipv4() { "A" } else { "AAAA" };
        println!("  {rtype} {addr}");
    }
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stderr().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metacrab=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<Shared> {
    match config_file {
        None => Err(anyhow!(
            "usage: {program_name} /path/to/config.json [record client-ip]"
        )),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}
