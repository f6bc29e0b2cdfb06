//! Shared test utilities.
//!
//! Helpers for an in-memory database, master data with sensible defaults, and a chain
//! of purchase order → Pre-GR → GQR that most transaction tests start from.

use crate::{
    core::{
        auth::Role,
        gqr::{self, GqrInput},
        item::{self, ItemInput},
        pre_gr::{self, PreGrInput},
        purchase_order::{self, PurchaseOrderInput},
        supplier::{self, SupplierInput},
        unit, user,
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Password given to every user made by [`create_test_user`].
pub const TEST_PASSWORD: &str = "correct-horse";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a unit; well-known names get their usual abbreviation.
pub async fn create_test_unit(
    db: &DatabaseConnection,
    name: &str,
    kg_factor: f64,
) -> Result<entities::unit::Model> {
    let abbreviation = match name {
        "Kilogram" => "kg".to_string(),
        "Quintal" => "qtl".to_string(),
        "Tonne" => "t".to_string(),
        other => other.to_lowercase(),
    };
    unit::create_unit(db, name.to_string(), abbreviation, kg_factor).await
}

/// Creates an active supplier with only a name.
pub async fn create_test_supplier(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::supplier::Model> {
    supplier::create_supplier(
        db,
        SupplierInput {
            name: name.to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates an active item with only a name.
pub async fn create_test_item(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::item_master::Model> {
    item::create_item(
        db,
        ItemInput {
            name: name.to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates an active user whose password is [`TEST_PASSWORD`].
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
) -> Result<entities::user_profile::Model> {
    user::insert_user(
        db,
        user::NewUser {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            full_name: None,
            role,
        },
    )
    .await
}

/// Database with one open purchase order and the masters it references.
pub struct PoFixture {
    pub db: DatabaseConnection,
    pub unit: entities::unit::Model,
    pub supplier: entities::supplier::Model,
    pub item: entities::item_master::Model,
    pub purchase_order: entities::purchase_order::Model,
}

/// [`PoFixture`] plus one delivery against the order.
pub struct PreGrFixture {
    pub db: DatabaseConnection,
    pub unit: entities::unit::Model,
    pub supplier: entities::supplier::Model,
    pub item: entities::item_master::Model,
    pub purchase_order: entities::purchase_order::Model,
    pub pre_gr: entities::pre_gr_entry::Model,
}

/// [`PreGrFixture`] plus a draft GQR grading the delivery and a manager who can
/// settle it.
pub struct GqrFixture {
    pub db: DatabaseConnection,
    pub manager: entities::user_profile::Model,
    pub supplier: entities::supplier::Model,
    pub item: entities::item_master::Model,
    pub purchase_order: entities::purchase_order::Model,
    pub pre_gr: entities::pre_gr_entry::Model,
    pub gqr: entities::gqr_entry::Model,
}

fn order_input(
    supplier_id: i64,
    item_id: i64,
    unit_id: i64,
    quantity: f64,
    rate: f64,
) -> PurchaseOrderInput {
    PurchaseOrderInput {
        po_date: NaiveDate::from_ymd_opt(2024, 11, 5),
        supplier_id,
        item_id,
        sieve_size_id: None,
        unit_id,
        quantity,
        rate,
        delivery_location: Some("Lasalgaon yard".to_string()),
        remarks: None,
    }
}

/// Order input for the fixture's supplier, item and unit, dated 2024-11-05.
pub fn po_input(fixture: &PoFixture, quantity: f64, rate: f64) -> PurchaseOrderInput {
    order_input(
        fixture.supplier.id,
        fixture.item.id,
        fixture.unit.id,
        quantity,
        rate,
    )
}

/// Creates an open order for 100 quintal at 1800 per quintal (`PO/2024-25/0001`).
pub async fn setup_with_purchase_order() -> Result<PoFixture> {
    let db = setup_test_db().await?;
    let quintal = create_test_unit(&db, "Quintal", 100.0).await?;
    let supplier = create_test_supplier(&db, "Nashik Onion Traders").await?;
    let item = create_test_item(&db, "Red Onion").await?;

    let purchase_order = purchase_order::create_purchase_order(
        &db,
        order_input(supplier.id, item.id, quintal.id, 100.0, 1800.0),
        "buyer@example.com",
    )
    .await?;

    Ok(PoFixture {
        db,
        unit: quintal,
        supplier,
        item,
        purchase_order,
    })
}

/// Adds a delivery of 12000 kg gross, 2000 kg tare (`PGR/2024-25/0001`).
pub async fn setup_with_pre_gr() -> Result<PreGrFixture> {
    let fixture = setup_with_purchase_order().await?;
    let pre_gr = pre_gr::create_pre_gr(
        &fixture.db,
        PreGrInput {
            po_id: fixture.purchase_order.id,
            vehicle_number: Some("MH15 AB 1234".to_string()),
            arrival_date: NaiveDate::from_ymd_opt(2024, 11, 6),
            bag_count: 240,
            gross_weight_kg: 12_000.0,
            tare_weight_kg: 2_000.0,
            remarks: None,
        },
        "gate@example.com",
    )
    .await?;

    Ok(PreGrFixture {
        db: fixture.db,
        unit: fixture.unit,
        supplier: fixture.supplier,
        item: fixture.item,
        purchase_order: fixture.purchase_order,
        pre_gr,
    })
}

/// Graded weights totalling 9800 kg with small size paid at 8 per kg.
pub fn sample_gqr_input() -> GqrInput {
    GqrInput {
        pre_gr_id: None,
        inspection_date: NaiveDate::from_ymd_opt(2024, 11, 7),
        export_quality_kg: 7000.0,
        small_size_kg: 1500.0,
        rotten_kg: 800.0,
        sprouted_kg: 300.0,
        doubles_kg: 200.0,
        small_size_rate: Some(8.0),
        remarks: None,
    }
}

/// Adds a draft GQR for the delivery using [`sample_gqr_input`] (`GQR/2024-25/0001`)
/// and the manager `qc@example.com`.
pub async fn setup_with_gqr() -> Result<GqrFixture> {
    let fixture = setup_with_pre_gr().await?;
    let manager = create_test_user(&fixture.db, "qc@example.com", Role::Manager).await?;
    let gqr = gqr::create_gqr(
        &fixture.db,
        GqrInput {
            pre_gr_id: Some(fixture.pre_gr.id),
            ..sample_gqr_input()
        },
    )
    .await?;

    Ok(GqrFixture {
        db: fixture.db,
        manager,
        supplier: fixture.supplier,
        item: fixture.item,
        purchase_order: fixture.purchase_order,
        pre_gr: fixture.pre_gr,
        gqr,
    })
}

/// An unsaved GQR model with the given weights, for pure calculations.
pub fn sample_gqr_model(
    export_quality_kg: f64,
    small_size_kg: f64,
    rotten_kg: f64,
    sprouted_kg: f64,
    doubles_kg: f64,
    small_size_rate: Option<f64>,
) -> entities::gqr_entry::Model {
    let now = chrono::Utc::now();
    entities::gqr_entry::Model {
        id: 1,
        gqr_number: "GQR/2024-25/0001".to_string(),
        pre_gr_id: Some(1),
        inspection_date: NaiveDate::from_ymd_opt(2024, 11, 7).unwrap_or_default(),
        export_quality_kg,
        small_size_kg,
        rotten_kg,
        sprouted_kg,
        doubles_kg,
        small_size_rate,
        status: "draft".to_string(),
        value_after_gqr: None,
        finalized_at: None,
        finalized_by: None,
        tally_posted: false,
        tally_posted_at: None,
        tally_voucher_number: None,
        remarks: None,
        created_at: now,
        updated_at: now,
    }
}

/// Starts a one-shot HTTP server on localhost that answers successive connections with
/// `responses` in order, then returns its base URL.
#[allow(clippy::expect_used)]
pub async fn spawn_fake_tally(responses: Vec<String>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake Tally listener");
    let addr = listener.local_addr().expect("fake Tally address");

    tokio::spawn(async move {
        for body in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            read_request(&mut socket).await;
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}")
}

/// Reads headers and the declared body so the client sees a clean exchange.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
