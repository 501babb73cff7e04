use marketplace_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

/// 1x1 transparent PNG, already base64 encoded.
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&pool, "demo", "user@example.com", "user123", Role::User).await?;
    seed_listings(&pool, user_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

struct SampleListing {
    title: &'static str,
    description: &'static str,
    listing_type: &'static str,
    category: &'static str,
    condition: &'static str,
    amount: Option<i64>,
    // per day, per week, per month, deposit
    rates: Option<(i64, i64, i64, i64)>,
}

async fn seed_listings(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT count(*) FROM listings WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("Listings already seeded");
        return Ok(());
    }

    let samples = [
        SampleListing {
            title: "Road bike",
            description: "Aluminium frame, 54cm, recently serviced",
            listing_type: "sale",
            category: "Sports",
            condition: "good",
            amount: Some(350),
            rates: None,
        },
        SampleListing {
            title: "Camping tent",
            description: "Four person tent with rain fly",
            listing_type: "rental",
            category: "Outdoors",
            condition: "like-new",
            amount: None,
            rates: Some((15, 80, 250, 100)),
        },
        SampleListing {
            title: "Cordless drill",
            description: "18V drill with two batteries",
            listing_type: "rental",
            category: "Tools",
            condition: "fair",
            amount: None,
            rates: Some((8, 40, 120, 50)),
        },
    ];

    let mut tx = pool.begin().await?;
    for sample in samples {
        let listing_id = Uuid::new_v4();
        let image_id = Uuid::new_v4();
        let (per_day, per_week, per_month, deposit) = match sample.rates {
            Some((d, w, m, s)) => (Some(d), Some(w), Some(m), Some(s)),
            None => (None, None, None, None),
        };

        sqlx::query(
            "INSERT INTO images (id, data, content_type, filename) VALUES ($1, $2, 'image/png', 'placeholder.png')",
        )
        .bind(image_id)
        .bind(PLACEHOLDER_PNG)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO listings (
                id, seller_id, title, description, listing_type,
                price_amount, price_per_day, price_per_week, price_per_month, security_deposit,
                category, condition, status, location, delivery_available, contact_info
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'available', 'Springfield', false, 'user@example.com')
            "#,
        )
        .bind(listing_id)
        .bind(seller_id)
        .bind(sample.title)
        .bind(sample.description)
        .bind(sample.listing_type)
        .bind(sample.amount)
        .bind(per_day)
        .bind(per_week)
        .bind(per_month)
        .bind(deposit)
        .bind(sample.category)
        .bind(sample.condition)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO listing_images (listing_id, image_id, position) VALUES ($1, $2, 0)")
            .bind(listing_id)
            .bind(image_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    println!("Seeded listings");
    Ok(())
}
