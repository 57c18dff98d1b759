use sqlx::{Executor, PgPool};
use uuid::Uuid;

/// Seed the database with initial categories and locations.
///
/// This function is idempotent – it uses `ON CONFLICT DO NOTHING`
/// so it can safely be run multiple times.
pub async fn seed_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    println!("[Seeder] Seeding categories...");

    let categories = [
        ("Travel", "travel", "Trips, places and journeys."),
        ("Food", "food", "Recipes and restaurant notes."),
        ("Everyday life", "everyday-life", "Whatever happened today."),
    ];

    for (title, slug, description) in categories {
        pool.execute(
            sqlx::query(
                "INSERT INTO categories (title, slug, description) VALUES ($1, $2, $3) \
                 ON CONFLICT (slug) DO NOTHING",
            )
            .bind(title)
            .bind(slug)
            .bind(description),
        )
        .await?;
        let id: Uuid = sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_one(pool)
            .await?;
        println!("  - Ensured category '{}' (ID: {})", title, id);
    }

    println!("[Seeder] Seeding locations...");

    let locations = ["Amsterdam", "Lisbon", "Tbilisi"];
    for name in locations {
        pool.execute(
            sqlx::query(
                "INSERT INTO locations (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
            )
            .bind(name),
        )
        .await?;
        println!("  - Ensured location '{}'", name);
    }

    println!("[Seeder] Database seeding completed successfully.");
    Ok(())
}
