use jg_aura::AuraClient;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> jg_aura::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: monitor <host> <email> <password> [--interval <secs>]");
        std::process::exit(2);
    }
    let interval = args
        .iter()
        .position(|a| a == "--interval")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    let mut client = AuraClient::builder(&args[1], &args[2], &args[3]).build()?;

    println!("Logging in to {}...", args[1]);
    client.login().await?;
    println!("Connected. Polling every {interval}s...");

    loop {
        match client.get_thermostats().await {
            Ok(gateway) => {
                for t in &gateway.thermostats {
                    println!(
                        "[{}] {:.1}\u{00b0}C -> {:.1}\u{00b0}C | mode: {}{}",
                        t.name,
                        t.current_temperature.celsius(),
                        t.target_temperature.celsius(),
                        t.mode,
                        if t.on { " | ON" } else { "" },
                    );
                }
            }
            Err(e) => eprintln!("Poll error: {e}"),
        }
        match client.get_hot_water().await {
            Ok(hw) => println!("Hot water: {}", if hw.on { "on" } else { "off" }),
            Err(e) => eprintln!("Hot water error: {e}"),
        }
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }
}
