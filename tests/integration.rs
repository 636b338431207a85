use jg_aura::AuraClient;

/// Run with: cargo test --test integration -- --ignored
/// Requires a reachable gateway account:
///   JG_AURA_HOST=https://... JG_AURA_EMAIL=... JG_AURA_PASSWORD=...
fn live_client() -> AuraClient {
    let var = |name: &str| std::env::var(name).unwrap_or_else(|_| panic!("{name} not set"));
    AuraClient::builder(var("JG_AURA_HOST"), var("JG_AURA_EMAIL"), var("JG_AURA_PASSWORD"))
        .build()
        .expect("client should build")
}

#[tokio::test]
#[ignore]
async fn login_and_poll() {
    let mut client = live_client();

    client.login().await.expect("login failed");
    assert!(client.gateway_device_id().is_some());

    let gateway = client.get_thermostats().await.expect("thermostat poll failed");
    assert!(!gateway.thermostats.is_empty(), "should have at least one thermostat");
    for t in &gateway.thermostats {
        println!(
            "[{}] {} {} {} -> {}",
            t.id, t.name, t.mode, t.current_temperature, t.target_temperature
        );
    }

    let hot_water = client.get_hot_water().await.expect("hot water poll failed");
    println!("Hot water {}: {}", hot_water.id, if hot_water.on { "on" } else { "off" });
}
