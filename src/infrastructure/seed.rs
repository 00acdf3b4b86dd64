//! Demo catalog and accounts, loaded when `SEED_DEMO` is set.
//! Every insert ignores rows that already exist so seeding can be repeated.

use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::auth::hash_password;
use crate::models::{Role, book, category, user};

const PLACEHOLDER_IMAGE: &str = "/images/books/placeholder.svg";

const CATEGORIES: [(&str, &str); 4] = [
    ("Fiction", "fiction"),
    ("Non-fiction", "non-fiction"),
    ("Science", "science"),
    ("Business", "business"),
];

struct DemoBook {
    title: &'static str,
    slug: &'static str,
    author: &'static str,
    description: &'static str,
    price_cents: i64,
    stock: i32,
    category: &'static str,
}

const BOOKS: [DemoBook; 12] = [
    DemoBook {
        title: "The Silent River",
        slug: "the-silent-river",
        author: "Ava Bennett",
        description: "A lyrical mystery about a town that learns its river remembers everything.",
        price_cents: 1899,
        stock: 14,
        category: "fiction",
    },
    DemoBook {
        title: "Blueprints of Tomorrow",
        slug: "blueprints-of-tomorrow",
        author: "Miles Carter",
        description: "A practical guide to building resilient teams and sustainable products.",
        price_cents: 2599,
        stock: 12,
        category: "business",
    },
    DemoBook {
        title: "Starlight Equations",
        slug: "starlight-equations",
        author: "Rina Patel",
        description: "Explore cosmology through approachable math and vivid storytelling.",
        price_cents: 2399,
        stock: 9,
        category: "science",
    },
    DemoBook {
        title: "The Artisan Ledger",
        slug: "the-artisan-ledger",
        author: "Jonas Mire",
        description: "A sweeping family saga told through the journals of four generations.",
        price_cents: 2099,
        stock: 10,
        category: "fiction",
    },
    DemoBook {
        title: "Mindful Momentum",
        slug: "mindful-momentum",
        author: "Keisha Ortiz",
        description: "Gentle productivity practices for ambitious, overwhelmed humans.",
        price_cents: 1799,
        stock: 18,
        category: "non-fiction",
    },
    DemoBook {
        title: "Data Without Drama",
        slug: "data-without-drama",
        author: "Elliot Kim",
        description: "Learn analytics fundamentals with clear visuals and real case studies.",
        price_cents: 2699,
        stock: 15,
        category: "business",
    },
    DemoBook {
        title: "The Glass Orchard",
        slug: "the-glass-orchard",
        author: "Maeve Lin",
        description: "A haunting tale of memory, loss, and a garden that grows glass.",
        price_cents: 1999,
        stock: 11,
        category: "fiction",
    },
    DemoBook {
        title: "Signal and Noise",
        slug: "signal-and-noise",
        author: "Brandon Steele",
        description: "A grounded introduction to scientific thinking in everyday decisions.",
        price_cents: 2199,
        stock: 13,
        category: "science",
    },
    DemoBook {
        title: "The Honest Economy",
        slug: "the-honest-economy",
        author: "Lila Moreno",
        description: "Reimagining markets with transparency, equity, and long-term value.",
        price_cents: 2299,
        stock: 16,
        category: "business",
    },
    DemoBook {
        title: "Letters to the Wild",
        slug: "letters-to-the-wild",
        author: "Noah Hart",
        description: "Essays on solitude, nature, and the courage to start over.",
        price_cents: 1899,
        stock: 20,
        category: "non-fiction",
    },
    DemoBook {
        title: "Atlas of Small Wonders",
        slug: "atlas-of-small-wonders",
        author: "Priya Sen",
        description: "A pocket-sized guide to the everyday marvels hiding in plain sight.",
        price_cents: 1699,
        stock: 22,
        category: "non-fiction",
    },
    DemoBook {
        title: "Quantum Garden",
        slug: "quantum-garden",
        author: "Elias Novak",
        description: "A playful tour of quantum physics with analogies you will remember.",
        price_cents: 2499,
        stock: 8,
        category: "science",
    },
];

async fn seed_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<(), DbErr> {
    let password_hash = hash_password(password).map_err(DbErr::Custom)?;
    let now = chrono::Utc::now().to_rfc3339();

    let account = user::ActiveModel {
        name: Set(Some(name.to_owned())),
        email: Set(email.to_owned()),
        password_hash: Set(password_hash),
        role: Set(role.as_str().to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    user::Entity::insert(account)
        .on_conflict(OnConflict::column(user::Column::Email).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    // 1. Categories
    for (name, slug) in CATEGORIES {
        let row = category::ActiveModel {
            name: Set(name.to_owned()),
            slug: Set(slug.to_owned()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        category::Entity::insert(row)
            .on_conflict(OnConflict::column(category::Column::Slug).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
    }

    // 2. Accounts
    seed_user(db, "BookNest Admin", "admin@booknest.test", "admin123", Role::Admin).await?;
    seed_user(db, "BookNest User", "user@booknest.test", "user123", Role::User).await?;

    // 3. Books
    let mut inserted = 0u64;
    for demo in &BOOKS {
        let Some(category) = category::Entity::find()
            .filter(category::Column::Slug.eq(demo.category))
            .one(db)
            .await?
        else {
            continue;
        };

        let row = book::ActiveModel {
            title: Set(demo.title.to_owned()),
            slug: Set(demo.slug.to_owned()),
            author: Set(demo.author.to_owned()),
            description: Set(demo.description.to_owned()),
            price_cents: Set(demo.price_cents),
            currency: Set("MRU".to_owned()),
            stock: Set(demo.stock),
            image_url: Set(PLACEHOLDER_IMAGE.to_owned()),
            category_id: Set(category.id),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        inserted += book::Entity::insert(row)
            .on_conflict(OnConflict::column(book::Column::Slug).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
    }

    tracing::info!("Seeded {} new demo books", inserted);
    Ok(())
}
