//! `qe serve` — start the HTTP surface (§6.2) against the backend selected
//! by `DB_TYPE` (§6.4).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use qe_exec::Executor;
use qe_server::AppState;

use crate::cli::{GlobalArgs, ServeArgs};
use crate::commands::common::{bind_addr, db_type, load_registry, required_env, DbType};

pub async fn execute(args: &ServeArgs, global: &GlobalArgs) -> Result<()> {
    let registry = Arc::new(load_registry(global)?);
    let backend = db_type()?;

    let (executor, db_type_label): (Arc<dyn Executor>, &'static str) = match backend {
        DbType::Postgres => {
            let url = required_env("DATABASE_URL")?;
            let pg_config: tokio_postgres::Config =
                url.parse().context("invalid DATABASE_URL")?;
            let manager = Manager::from_config(
                pg_config,
                tokio_postgres::NoTls,
                ManagerConfig {
                    recycling_method: RecyclingMethod::Fast,
                },
            );
            let pool = Pool::builder(manager)
                .build()
                .context("failed to create Postgres connection pool")?;
            (Arc::new(qe_exec::PostgresExecutor::new(pool)), "postgres")
        }
        DbType::Mongo => {
            let uri = required_env("MONGODB_URI")?;
            let db_name = required_env("MONGODB_DATABASE")?;
            let client = mongodb::Client::with_uri_str(&uri)
                .await
                .context("failed to connect to MongoDB")?;
            let database = client.database(&db_name);
            (Arc::new(qe_exec::MongoExecutor::new(database)), "mongo")
        }
    };

    let state = Arc::new(AppState {
        registry,
        executor,
        db_type: db_type_label,
    });

    let resolved = bind_addr(&args.addr);
    let addr: SocketAddr = resolved
        .parse()
        .with_context(|| format!("invalid bind address '{resolved}'"))?;

    qe_server::serve(addr, state)
        .await
        .context("HTTP server failed")
}
