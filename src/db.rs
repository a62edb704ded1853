use crate::error::ApiError;
use crate::config::DatabaseConfig;
use crate::media::StoredImage;
use crate::models::user::User;
use crate::models::post::Post;
use deadpool_postgres::{Config, Object, Pool, PoolConfig, Runtime};
use postgres_native_tls::MakeTlsConnector;
use native_tls::TlsConnector;
use tokio_postgres::{types::ToSql, Row};
use tracing::{error, info, warn};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, avatar_url, avatar_public_id, created_at, updated_at";
const POST_COLUMNS: &str =
    "id, user_id, title, content, image_url, image_public_id, created_at, updated_at";

/// Repository over a deadpool-managed PostgreSQL pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

/// Column changes for a partial update. `None` leaves the column as-is.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub avatar: Option<StoredImage>,
}

#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<StoredImage>,
}

impl Database {
    /// Builds the pool and checks that a connection can actually be made.
    pub async fn new(config: DatabaseConfig) -> Result<Self, ApiError> {
        info!("Creating PostgreSQL connection pool for host: {}:{}", config.host, config.port);

        let db = Self::connect_lazy(config)?;
        db.health_check().await?;

        Ok(db)
    }

    /// Builds the pool without touching the server; connections open on first use.
    pub fn connect_lazy(config: DatabaseConfig) -> Result<Self, ApiError> {
        let pool = Self::create_pool(config)?;
        Ok(Database { pool })
    }

    fn create_pool(config: DatabaseConfig) -> Result<Pool, ApiError> {
        let mut pg_config = Config::new();

        pg_config.host = Some(config.host);
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.database);
        pg_config.user = Some(config.username);
        pg_config.password = Some(config.password);

        pg_config.ssl_mode = Some(match config.ssl_mode.as_str() {
            "disable" => deadpool_postgres::SslMode::Disable,
            "allow" | "prefer" => deadpool_postgres::SslMode::Prefer,
            "require" | "verify-ca" | "verify-full" => deadpool_postgres::SslMode::Require,
            other => {
                warn!("Unknown SSL mode '{}', defaulting to 'require'", other);
                deadpool_postgres::SslMode::Require
            }
        });

        pg_config.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(config.max_connections as usize);
        pool_config.timeouts.wait = Some(config.connection_timeout);
        pool_config.timeouts.create = Some(config.connection_timeout);
        pg_config.pool = Some(pool_config);

        let tls_connector = TlsConnector::builder()
            .build()
            .map_err(|e| {
                error!("Failed to create TLS connector: {}", e);
                ApiError::Database(format!("TLS connector creation failed: {}", e))
            })?;
        let tls = MakeTlsConnector::new(tls_connector);

        pg_config.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| {
                error!("Failed to create connection pool: {}", e);
                ApiError::Database(format!("Connection pool creation failed: {}", e))
            })
    }

    async fn get_connection(&self) -> Result<Object, ApiError> {
        self.pool.get().await.map_err(ApiError::from)
    }

    pub async fn health_check(&self) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[])
            .await
            .map_err(|e| {
                error!("Database health check failed: {}", e);
                ApiError::Database(format!("Health check failed: {}", e))
            })?;

        Ok(())
    }

    /// Idempotent schema setup, run once at startup.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        info!("Running database migrations");

        let client = self.get_connection().await?;

        let statements = [
            (
                "users table",
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id UUID PRIMARY KEY,
                    name VARCHAR(100) NOT NULL,
                    email VARCHAR(255) UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    avatar_url TEXT,
                    avatar_public_id TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "posts table",
                r#"
                CREATE TABLE IF NOT EXISTS posts (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title VARCHAR(200) NOT NULL,
                    content TEXT NOT NULL,
                    image_url TEXT,
                    image_public_id TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "posts user_id index",
                "CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id)",
            ),
            (
                "posts created_at index",
                "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC)",
            ),
        ];

        for (name, statement) in statements {
            client.execute(statement, &[])
                .await
                .map_err(|e| {
                    error!("Failed to create {}: {}", name, e);
                    ApiError::Database(format!("Migration of {} failed: {}", name, e))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    // User repository operations

    pub async fn create_user(&self, user: User) -> Result<User, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );

        let row = client.query_one(
            &query,
            &[
                &user.id,
                &user.name,
                &user.email,
                &user.password_hash,
                &user.avatar_url,
                &user.avatar_public_id,
                &user.created_at,
                &user.updated_at,
            ],
        )
        .await?;

        let created_user = user_from_row(&row);
        info!("Created user with id: {}", created_user.id);
        Ok(created_user)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        client.query_opt(&query, &[&user_id])
            .await?
            .map(|row| user_from_row(&row))
            .ok_or_else(|| ApiError::not_found("User"))
    }

    /// Lookup for login; emails are stored lower-cased.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let row = client.query_opt(&query, &[&email]).await?;
        Ok(row.map(|row| user_from_row(&row)))
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");

        let rows = client.query(&query, &[]).await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    pub async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<User, ApiError> {
        let client = self.get_connection().await?;

        let updated_at = chrono::Utc::now();
        let avatar_url = changes.avatar.as_ref().map(|a| a.secure_url.clone());
        let avatar_public_id = changes.avatar.as_ref().map(|a| a.public_id.clone());

        let mut set = SetClause::default();
        set.push_opt("name", &changes.name);
        set.push_opt("email", &changes.email);
        set.push_opt("password_hash", &changes.password_hash);
        set.push_opt("avatar_url", &avatar_url);
        set.push_opt("avatar_public_id", &avatar_public_id);
        set.push("updated_at", &updated_at);

        let (assignments, mut params) = set.finish();
        params.push(&user_id);

        let query = format!(
            "UPDATE users SET {} WHERE id = ${} RETURNING {USER_COLUMNS}",
            assignments,
            params.len()
        );

        let row = client.query_opt(&query, &params).await?;

        match row {
            Some(row) => {
                let updated_user = user_from_row(&row);
                info!("Updated user with id: {}", updated_user.id);
                Ok(updated_user)
            }
            None => Err(ApiError::not_found("User")),
        }
    }

    /// Deletes a user and, through `ON DELETE CASCADE`, their posts.
    /// Returns the media-host ids that were referenced by the removed rows.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<Vec<String>, ApiError> {
        let mut client = self.get_connection().await?;
        let transaction = client.transaction().await?;

        let image_rows = transaction
            .query(
                "SELECT image_public_id FROM posts WHERE user_id = $1 AND image_public_id IS NOT NULL",
                &[&user_id],
            )
            .await?;

        let avatar_row = transaction
            .query_opt(
                "DELETE FROM users WHERE id = $1 RETURNING avatar_public_id",
                &[&user_id],
            )
            .await?;

        let Some(avatar_row) = avatar_row else {
            return Err(ApiError::not_found("User"));
        };

        transaction.commit().await?;

        let mut public_ids: Vec<String> = image_rows.iter().map(|row| row.get(0)).collect();
        let avatar_public_id: Option<String> = avatar_row.get(0);
        if let Some(avatar_public_id) = avatar_public_id {
            public_ids.push(avatar_public_id);
        }

        info!(
            "Deleted user with id: {} (cascade deleted posts, {} media references)",
            user_id,
            public_ids.len()
        );
        Ok(public_ids)
    }

    // Post repository operations

    pub async fn create_post(&self, post: Post) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {POST_COLUMNS}"
        );

        let row = client.query_one(
            &query,
            &[
                &post.id,
                &post.user_id,
                &post.title,
                &post.content,
                &post.image_url,
                &post.image_public_id,
                &post.created_at,
                &post.updated_at,
            ],
        )
        .await?;

        let created_post = post_from_row(&row);
        info!("Created post with id: {}", created_post.id);
        Ok(created_post)
    }

    pub async fn get_post_by_id(&self, post_id: Uuid) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");

        client.query_opt(&query, &[&post_id])
            .await?
            .map(|row| post_from_row(&row))
            .ok_or_else(|| ApiError::not_found("Post"))
    }

    /// Newest first, optionally restricted to one author.
    pub async fn get_all_posts(&self, user_id_filter: Option<Uuid>) -> Result<Vec<Post>, ApiError> {
        let client = self.get_connection().await?;

        let rows = match user_id_filter {
            Some(user_id) => {
                let query = format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE user_id = $1 ORDER BY created_at DESC"
                );
                client.query(&query, &[&user_id]).await?
            }
            None => {
                let query = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC");
                client.query(&query, &[]).await?
            }
        };

        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;

        let updated_at = chrono::Utc::now();
        let image_url = changes.image.as_ref().map(|i| i.secure_url.clone());
        let image_public_id = changes.image.as_ref().map(|i| i.public_id.clone());

        let mut set = SetClause::default();
        set.push_opt("title", &changes.title);
        set.push_opt("content", &changes.content);
        set.push_opt("image_url", &image_url);
        set.push_opt("image_public_id", &image_public_id);
        set.push("updated_at", &updated_at);

        let (assignments, mut params) = set.finish();
        params.push(&post_id);

        let query = format!(
            "UPDATE posts SET {} WHERE id = ${} RETURNING {POST_COLUMNS}",
            assignments,
            params.len()
        );

        let row = client.query_opt(&query, &params).await?;

        match row {
            Some(row) => {
                let updated_post = post_from_row(&row);
                info!("Updated post with id: {}", updated_post.id);
                Ok(updated_post)
            }
            None => Err(ApiError::not_found("Post")),
        }
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let rows_affected = client.execute("DELETE FROM posts WHERE id = $1", &[&post_id]).await?;

        if rows_affected == 0 {
            Err(ApiError::not_found("Post"))
        } else {
            info!("Deleted post with id: {}", post_id);
            Ok(())
        }
    }
}

/// Accumulates `column = $n` assignments with their bound parameters.
#[derive(Default)]
struct SetClause<'a> {
    assignments: Vec<String>,
    params: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> SetClause<'a> {
    fn push(&mut self, column: &str, value: &'a (dyn ToSql + Sync)) {
        self.params.push(value);
        self.assignments.push(format!("{} = ${}", column, self.params.len()));
    }

    fn push_opt<T: ToSql + Sync + 'a>(&mut self, column: &str, value: &'a Option<T>) {
        if let Some(value) = value {
            self.push(column, value);
        }
    }

    fn finish(self) -> (String, Vec<&'a (dyn ToSql + Sync)>) {
        (self.assignments.join(", "), self.params)
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get(0),
        name: row.get(1),
        email: row.get(2),
        password_hash: row.get(3),
        avatar_url: row.get(4),
        avatar_public_id: row.get(5),
        created_at: row.get(6),
        updated_at: row.get(7),
    }
}

fn post_from_row(row: &Row) -> Post {
    Post {
        id: row.get(0),
        user_id: row.get(1),
        title: row.get(2),
        content: row.get(3),
        image_url: row.get(4),
        image_public_id: row.get(5),
        created_at: row.get(6),
        updated_at: row.get(7),
    }
}
