use stress_test::{stress_test_convergence, stress_test_scaling, StressConfig};
pub mod stress_test;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            OT CONVERGENCE STRESS TESTS                     ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut all_converged = true;

    // Test 1: a few clients, mostly delivering
    let stats = stress_test_convergence(StressConfig {
        clients: 3,
        edits_per_client: 100,
        delivery_ratio: 0.7,
        ..StressConfig::default()
    })
    .await?;
    stats.print();
    all_converged &= stats.converged;

    // Test 2: many clients, long bursts of offline typing
    let stats = stress_test_convergence(StressConfig {
        clients: 10,
        edits_per_client: 200,
        delivery_ratio: 0.3,
        ..StressConfig::default()
    })
    .await?;
    stats.print();
    all_converged &= stats.converged;

    // Test 3: starting from an empty document
    let stats = stress_test_convergence(StressConfig {
        clients: 6,
        edits_per_client: 150,
        initial_text: String::new(),
        ..StressConfig::default()
    })
    .await?;
    stats.print();
    all_converged &= stats.converged;

    // Test 4: scaling analysis
    for stats in stress_test_scaling(16, 4).await? {
        all_converged &= stats.converged;
    }

    if !all_converged {
        return Err("replicas diverged".into());
    }
    println!("\n✓ All convergence runs completed successfully!");
    Ok(())
}
