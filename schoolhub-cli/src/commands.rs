/// Command implementations

use crate::{EntityKind, FallbackKind, StateAction};
use anyhow::Context;
use schoolhub_shared::auth::AuthService;
use schoolhub_shared::backend::{AuthBackend, MemoryBackend, RestBackend, TableBackend};
use schoolhub_shared::config::Config;
use schoolhub_shared::fallback::{
    FallbackGenerator, StatusWeights, DEFAULT_STAFF_COUNT, DEFAULT_STUDENT_COUNT,
};
use schoolhub_shared::services::Services;
use schoolhub_shared::state::LocalStore;
use serde::Serialize;
use std::sync::Arc;

/// Both backend interfaces, REST when configured, offline memory otherwise
struct Backends {
    tables: Arc<dyn TableBackend>,
    auth: Arc<dyn AuthBackend>,
    offline: bool,
}

fn connect(config: &Config) -> anyhow::Result<Backends> {
    match &config.backend {
        Some(backend) => {
            let (tables, auth) = RestBackend::connect(backend)
                .with_context(|| format!("building REST clients for {}", backend.url))?;
            tracing::debug!(url = %backend.url, "Using REST backend");
            Ok(Backends {
                tables: Arc::new(tables),
                auth: Arc::new(auth),
                offline: false,
            })
        }
        None => {
            tracing::warn!("SCHOOLHUB_BACKEND_URL not set, running offline");
            let memory = Arc::new(MemoryBackend::new());
            memory.set_offline(true);
            Ok(Backends {
                tables: memory.clone(),
                auth: memory,
                offline: true,
            })
        }
    }
}

fn generator(config: &Config, seed: Option<u64>) -> anyhow::Result<FallbackGenerator> {
    let generator = FallbackGenerator::from_seed(seed.or(config.fallback_seed), StatusWeights::default())?;
    tracing::info!(
        seed = generator.seed(),
        reproducible = generator.is_reproducible(),
        "Fallback generator ready"
    );
    Ok(generator)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn check(config: &Config) -> anyhow::Result<()> {
    let backends = connect(config)?;
    if backends.offline {
        println!("offline: no backend configured");
        return Ok(());
    }

    backends
        .tables
        .ping()
        .await
        .context("backend health check failed")?;
    println!("ok");
    Ok(())
}

pub async fn seed_demo(config: &Config) -> anyhow::Result<()> {
    let backends = connect(config)?;
    let auth = AuthService::new(backends.auth, backends.tables, config.auth_deadline);

    let created = auth.seed_demo_users().await?;
    tracing::info!(created, "Demo users seeded");
    println!("{} demo user(s) created", created);
    Ok(())
}

pub async fn list(config: &Config, entity: EntityKind) -> anyhow::Result<()> {
    let backends = connect(config)?;
    let services = Services::new(
        backends.tables,
        backends.auth,
        config.resilience.clone(),
        Some(generator(config, None)?),
    );

    match entity {
        EntityKind::Students => print_json(&services.students.get_all().await?),
        EntityKind::Staff => print_json(&services.staff.get_all().await?),
        EntityKind::Attendance => print_json(&services.attendance.get_all().await?),
        EntityKind::Grades => print_json(&services.grades.get_all().await?),
        EntityKind::Billing => print_json(&services.billing.get_all().await?),
        EntityKind::Users => print_json(&services.users.get_all().await?),
        EntityKind::Settings => print_json(&services.settings.get_all().await?),
    }
}

pub fn fallback(
    config: &Config,
    entity: FallbackKind,
    seed: Option<u64>,
    count: Option<usize>,
) -> anyhow::Result<()> {
    let generator = generator(config, seed)?;

    match entity {
        FallbackKind::Students => {
            print_json(&generator.students(count.unwrap_or(DEFAULT_STUDENT_COUNT)))
        }
        FallbackKind::Staff => print_json(&generator.staff(count.unwrap_or(DEFAULT_STAFF_COUNT))),
        FallbackKind::Users => print_json(&generator.users()),
    }
}

pub async fn sign_in(config: &Config, email: &str, password: &str) -> anyhow::Result<()> {
    let backends = connect(config)?;
    let auth = AuthService::new(backends.auth, backends.tables, config.auth_deadline);
    let user = auth.sign_in(email, password).await?;

    let store = LocalStore::new(&config.state_path);
    let mut state = store.load().await?;
    state.user = Some(user.clone());
    store
        .save(&state)
        .await
        .with_context(|| format!("writing {}", store.path().display()))?;

    print_json(&user)
}

pub async fn state(config: &Config, action: StateAction) -> anyhow::Result<()> {
    let store = LocalStore::new(&config.state_path);

    match action {
        StateAction::Show => print_json(&store.load().await?),
        StateAction::Clear => {
            store.clear().await?;
            tracing::info!(path = %store.path().display(), "Cleared client state");
            Ok(())
        }
    }
}
