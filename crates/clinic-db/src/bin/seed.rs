//! # Seed Data Generator
//!
//! Populates the database with a starter medicine inventory for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default dev database
//! cargo run -p clinic-db --bin seed
//!
//! # Specify database path
//! cargo run -p clinic-db --bin seed -- --db ./data/clinic.db
//!
//! # Also record a few sample dispenses
//! cargo run -p clinic-db --bin seed -- --with-bills
//! ```
//!
//! Each lot gets a cost price, a selling price 20-60% above cost, a stock
//! level between 1 and 60, and an expiry 6-30 months out.

use chrono::{Datelike, Utc};
use clinic_core::{DispenseLine, DoseSlot, DoseTiming, ExpiryMonth, NewMedicine};
use clinic_db::{Database, DbConfig};
use std::env;

/// (name, cost in paise)
const MEDICINES: &[(&str, i64)] = &[
    ("Dolo 650", 150),
    ("Crocin Advance", 120),
    ("Azithral 500", 1150),
    ("Augmentin 625 Duo", 1900),
    ("Pan 40", 90),
    ("Pantocid DSR", 140),
    ("Cetzine 10", 25),
    ("Allegra 120", 180),
    ("Montair LC", 160),
    ("Zincovit", 95),
    ("Becosules", 45),
    ("Shelcal 500", 70),
    ("Limcee 500", 20),
    ("ORS Electral", 200),
    ("Meftal Spas", 40),
    ("Ondem 4", 55),
    ("Digene Tablet", 18),
    ("Benadryl Syrup", 11000),
    ("Ascoril LS Syrup", 11500),
    ("Betadine Ointment", 9000),
];

const PHONES: &[&str] = &["9876543210", "9123456789", "9988776655"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./clinic_dev.db");
    let mut with_bills = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--with-bills" => with_bills = true,
            "--help" | "-h" => {
                println!("Clinic Dispensary Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./clinic_dev.db)");
                println!("      --with-bills   Record sample dispenses after stocking");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Clinic Dispensary Seed Data Generator");
    println!("=======================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.inventory().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} medicines", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Stocking inventory...");

    let today = Utc::now().date_naive();
    let mut lots = Vec::with_capacity(MEDICINES.len());

    for (seed, (name, cost)) in MEDICINES.iter().enumerate() {
        let input = generate_medicine(name, *cost, seed, today.year(), today.month())?;
        match db.inventory().insert(&input).await {
            Ok(lot) => lots.push(lot),
            Err(e) => eprintln!("Failed to insert {}: {}", name, e),
        }
    }

    println!("✓ Stocked {} medicines", lots.len());

    if with_bills {
        println!();
        println!("Recording sample dispenses...");

        let mut recorded = 0;
        for (n, lot) in lots.iter().filter(|l| l.quantity >= 2).take(6).enumerate() {
            let line = DispenseLine::from_lot(lot, 2, None)
                .with_timings(vec![DoseTiming::standard(DoseSlot::Morning)]);
            let phone = PHONES[n % PHONES.len()];

            match db.dispenser().commit_dispense(phone, &[line]).await {
                Ok(bill) => {
                    recorded += 1;
                    println!("  {} → {} ({})", phone, bill.bill_total(), lot.name);
                }
                Err(e) => eprintln!("Failed to dispense {}: {}", lot.name, e),
            }
        }
        println!("✓ Recorded {} bills", recorded);
    }

    let low = db.inventory().low_stock(clinic_core::DEFAULT_LOW_STOCK_THRESHOLD).await?;
    println!();
    println!("Low stock: {} lots", low.len());
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one lot with deterministic pseudo-random stock, margin and expiry.
fn generate_medicine(
    name: &str,
    cost_price_paise: i64,
    seed: usize,
    year: i32,
    month: u32,
) -> Result<NewMedicine, Box<dyn std::error::Error>> {
    let margin_pct = 20 + ((seed * 13) % 41) as i64;
    let selling_price_paise = cost_price_paise + cost_price_paise * margin_pct / 100;

    let quantity = ((seed * 37) % 61) as i64;

    let months_out = 6 + (seed * 7) % 25;
    let total_months = month as usize - 1 + months_out;
    let expiry = ExpiryMonth::new(year + (total_months / 12) as i32, (total_months % 12) as u32 + 1)?;

    Ok(NewMedicine {
        name: name.to_string(),
        // Seed 0 would give an empty lot, which the add form rejects.
        quantity: quantity.max(1),
        cost_price_paise,
        selling_price_paise,
        expiry: Some(expiry),
    })
}
