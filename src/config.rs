// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{FollowUpRepair, MemoryCollectionRepository, PgCollectionRepository, RecordStore},
    services::{change_feed::ChangeFeed, BoardController},
};

// --- Configuração lida do ambiente ---

#[derive(Debug, Clone)]
pub struct Settings {
    // Sem DATABASE_URL o quadro roda em memória
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub default_locale: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            db_max_connections: 5,
            db_acquire_timeout: Duration::from_secs(3),
            default_locale: "pt".to_string(),
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Settings::default();

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("DB_MAX_CONNECTIONS inválido: {v}"))?,
            None => defaults.db_max_connections,
        };

        let db_acquire_timeout = match var("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse().with_context(|| format!("DB_ACQUIRE_TIMEOUT_SECS inválido: {v}"))?,
            ),
            None => defaults.db_acquire_timeout,
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            db_max_connections,
            db_acquire_timeout,
            default_locale: var("DEFAULT_LOCALE").unwrap_or(defaults.default_locale),
        })
    }
}

// --- Estado compartilhado pelos handlers ---

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub board: Arc<BoardController>,
    pub change_feed: Arc<ChangeFeed>,
    pub i18n_store: Arc<I18nStore>,
}

impl AppState {
    /// Conecta ao banco (se configurado), roda as migrações e carrega o quadro.
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let Some(database_url) = settings.database_url.as_deref() else {
            tracing::warn!("DATABASE_URL não definida, usando armazenamento em memória");
            let repo = Arc::new(MemoryCollectionRepository::new());
            return Self::with_store(repo.clone(), repo, settings).await;
        };

        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(settings.db_acquire_timeout)
            .connect(database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        let repo = Arc::new(PgCollectionRepository::new(db_pool.clone()));
        let mut state = Self::with_store(repo.clone(), repo, settings).await?;
        state.db_pool = Some(db_pool);
        Ok(state)
    }

    /// Monta o grafo de dependências em cima de qualquer armazenamento.
    pub async fn with_store(
        store: Arc<dyn RecordStore>,
        repair: Arc<dyn FollowUpRepair>,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let change_feed = Arc::new(ChangeFeed::default());
        let board = BoardController::new(store, repair).with_observer(change_feed.clone());

        board.load().await.context("Falha ao carregar o quadro")?;

        Ok(Self {
            db_pool: None,
            board: Arc::new(board),
            change_feed,
            i18n_store: Arc::new(I18nStore::new(&settings.default_locale)),
        })
    }
}
