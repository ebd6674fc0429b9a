use rust_decimal::Decimal;

use crate::commands::CommandResult;
use fixbid_core::config::{AppConfig, LoadOptions};
use fixbid_core::domain::provider::{Provider, ProviderId, VerificationStatus};
use fixbid_core::domain::UserId;
use fixbid_core::geo::GeoPoint;
use fixbid_db::repositories::{ProviderRepository, SqlProviderRepository};
use fixbid_db::{connect_with_settings, migrations};

/// Deterministic demo providers around central Delhi, matching the
/// coordinates the workflow tests use.
fn demo_providers() -> Vec<Provider> {
    vec![
        Provider {
            id: ProviderId("seed-prov-1".to_string()),
            user_id: UserId("seed-user-1".to_string()),
            name: "Ravi Kumar".to_string(),
            phone: Some("+91-9876500001".to_string()),
            rating: Some(4.8),
            skills: vec!["plumber".to_string()],
            availability: true,
            location: Some(GeoPoint::new(28.6519, 77.1909)),
            verification: VerificationStatus::Verified,
            deposit_balance: Decimal::new(1_000, 0),
        },
        Provider {
            id: ProviderId("seed-prov-2".to_string()),
            user_id: UserId("seed-user-2".to_string()),
            name: "Sunita Sharma".to_string(),
            phone: Some("+91-9876500002".to_string()),
            rating: Some(4.5),
            skills: vec!["electrician".to_string(), "carpenter".to_string()],
            availability: true,
            location: Some(GeoPoint::new(28.5644, 77.2432)),
            verification: VerificationStatus::Verified,
            deposit_balance: Decimal::new(750, 0),
        },
        Provider {
            id: ProviderId("seed-prov-3".to_string()),
            user_id: UserId("seed-user-3".to_string()),
            name: "Arjun Mehta".to_string(),
            phone: None,
            rating: None,
            skills: vec!["painter".to_string()],
            availability: true,
            location: None,
            verification: VerificationStatus::Pending,
            deposit_balance: Decimal::ZERO,
        },
    ]
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repo = SqlProviderRepository::new(pool.clone());
        let providers = demo_providers();
        let count = providers.len();
        for provider in providers {
            repo.save(provider)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;
        }

        pool.close().await;
        Ok::<usize, (&'static str, String, u8)>(count)
    });

    match result {
        Ok(count) => CommandResult::success("seed", format!("seeded {count} demo providers")),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
