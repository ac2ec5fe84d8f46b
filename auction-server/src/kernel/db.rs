use {
    anyhow::Result,
    sqlx::{
        postgres::PgPoolOptions,
        Pool,
        Postgres,
    },
    std::time::Duration,
};

pub type DB = Pool<Postgres>;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(database_url: &str) -> Result<DB> {
    let db = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    Ok(db)
}

pub async fn migrate(db: &DB) -> Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}
