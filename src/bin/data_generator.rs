use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

const BOROUGHS: [(&str, f64, u32); 5] = [
    // (name, median-ish price, relative weight)
    ("Manhattan", 150.0, 44),
    ("Brooklyn", 90.0, 41),
    ("Queens", 75.0, 12),
    ("Bronx", 65.0, 2),
    ("Staten Island", 75.0, 1),
];

const ROOM_TYPES: [(&str, f64, u32); 3] = [
    ("Entire home/apt", 1.6, 52),
    ("Private room", 0.7, 46),
    ("Shared room", 0.5, 2),
];

fn pick<'a, T>(rng: &mut impl Rng, table: &'a [(&'a str, T, u32)]) -> &'a (&'a str, T, u32) {
    let total: u32 = table.iter().map(|(_, _, w)| w).sum();
    let mut roll = rng.random_range(0..total);
    for entry in table {
        if roll < entry.2 {
            return entry;
        }
        roll -= entry.2;
    }
    &table[table.len() - 1]
}

fn main() -> std::io::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/listings.csv".to_string());
    let rows: usize = args.next().and_then(|n| n.parse().ok()).unwrap_or(50_000);

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "id,name,host_id,neighbourhood_group,room_type,price,minimum_nights"
    )?;

    let mut rng = rand::rng();
    for i in 0..rows {
        let (borough, base, _) = *pick(&mut rng, &BOROUGHS);
        let (room_type, factor, _) = *pick(&mut rng, &ROOM_TYPES);

        // long right tail, with the occasional luxury listing
        let spread: f64 = rng.random_range(0.3..2.0);
        let mut price = (base * factor * spread * spread).round();
        if rng.random_ratio(1, 500) {
            price = rng.random_range(1_000..10_000) as f64;
        }
        if rng.random_ratio(1, 2_000) {
            price = 0.0;
        }

        writeln!(
            writer,
            "{},\"{} listing #{}, {}\",{},{},{},{},{}",
            i,
            room_type,
            i,
            borough,
            rng.random_range(1_000..300_000_000u64),
            borough,
            room_type,
            price,
            rng.random_range(1..30)
        )?;
    }

    writer.flush()?;
    println!("Sample listings CSV generated: {} ({} rows)", path, rows);
    Ok(())
}
