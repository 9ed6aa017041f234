//! Interactive CLI demo of the full provenance ledger lifecycle.
//!
//! Walks through chain creation, harvest record sealing, label hash
//! verification, and tamper detection, narrated with ANSI-colored output.
//!
//! Run it with `cargo run -p verdant-ledger --example demo --release`.

use std::time::Instant;

use verdant_ledger::{validate_blocks, Chain, Payload};

// -- Palette ----------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";

// -- Console helpers --------------------------------------------------------

fn banner() {
    println!();
    println!("{BOLD}{GREEN}+----------------------------------------------------------------+{RESET}");
    println!("{BOLD}{GREEN}|  VERDANT LEDGER  -  herb provenance on a hash-linked chain     |{RESET}");
    println!("{BOLD}{GREEN}|  SHA-256 digests over canonical payload bytes                  |{RESET}");
    println!("{BOLD}{GREEN}+----------------------------------------------------------------+{RESET}");
    println!();
}

fn step(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}{:-<72}{RESET}", format!("-- {num}. {title} "));
}

fn note(text: &str) {
    println!("  {DIM}{text}{RESET}");
}

fn ok(text: &str) {
    println!("  {GREEN}+ {text}{RESET}");
}

fn alert(text: &str) {
    println!("  {RED}! {text}{RESET}");
}

fn field(label: &str, value: &str) {
    println!("  {label:<22}{YELLOW}{value}{RESET}");
}

fn took(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("  {DIM}{MAGENTA}{label} took {ms:.3} ms{RESET}");
}

// -- Scenario ---------------------------------------------------------------

/// Builds a harvest record payload for one farmer's submission.
fn harvest(farmer: &str, herb: &str, cost: f64) -> Payload {
    Payload::new()
        .with("farmer_name", farmer)
        .with("herb_type", herb)
        .with("location", "Karnataka")
        .with("season", "monsoon")
        .with("cost_per_kg", cost)
}

fn main() {
    let t0 = Instant::now();

    banner();

    step(1, "Chain creation");
    note("Starting a fresh provenance chain at its genesis block.");

    let t = Instant::now();
    let mut chain = Chain::new();
    took("genesis", t.elapsed());

    let genesis = chain.tip();
    field("Genesis hash", genesis.short_id());
    field("Genesis parent", &genesis.previous_hash);
    ok("Genesis block sealed, the chain anchor is in place");

    step(2, "Sealing harvest records");
    note("Three farmers submit their harvests.");

    let submissions = [
        ("Asha Kulkarni", "Tulsi", 10.0),
        ("Ravi Patil", "Neem", 7.5),
        ("Meera Joshi", "Ashwagandha", 24.0),
    ];

    let mut label_hashes = Vec::new();
    for (farmer, herb, cost) in submissions {
        let t = Instant::now();
        let block = chain
            .append(harvest(farmer, herb, cost))
            .expect("harvest payload is encodable");
        let sealed_in = t.elapsed();

        println!();
        field("Record", &format!("{herb} from {farmer}"));
        field("Block index", &block.index.to_string());
        field("Block hash", block.short_id());
        field("Links to", &block.previous_hash[..8.min(block.previous_hash.len())]);
        took("seal", sealed_in);

        label_hashes.push(block.hash.clone());
    }

    println!();
    ok("Three records sealed, each block linked to its predecessor");

    step(3, "Status and full revalidation");
    note("Recomputing every digest and checking every link.");

    let t = Instant::now();
    let status = chain.status();
    took("full revalidation", t.elapsed());

    field("Total blocks", &status.length.to_string());
    field("Chain valid", &status.is_valid.to_string());
    field("Latest hash", &status.latest_hash[..8]);
    assert!(status.is_valid);
    ok("Every block re-hashes to its stored digest");

    step(4, "Label hash verification");
    note("A shopkeeper scans the Neem label and looks up its hash.");

    let neem_hash = &label_hashes[1];
    let t = Instant::now();
    let found = chain.find_by_hash(neem_hash);
    took("lookup", t.elapsed());

    let block = found.expect("sealed record is findable");
    field("Found block", &block.index.to_string());
    if let Some(herb) = block.payload.get("herb_type") {
        field("Herb", &herb.to_string());
    }
    if let Some(farmer) = block.payload.get("farmer_name") {
        field("Farmer", &farmer.to_string());
    }
    ok("Label resolves to the sealed record");

    note("Lookups are exact. An uppercased hash is a different string.");
    let shouted = neem_hash.to_uppercase();
    assert!(chain.find_by_hash(&shouted).is_none());
    ok("Case-shifted hash misses, as it should");

    step(5, "Tamper detection");
    note("An exporter tries to relabel the Neem harvest as Tulsi.");

    let mut forged = chain.blocks().to_vec();
    forged[2].payload = harvest("Ravi Patil", "Tulsi", 7.5);

    let t = Instant::now();
    let verdict = validate_blocks(&forged);
    took("revalidation", t.elapsed());

    assert!(!verdict);
    alert("Edited payload no longer matches its sealed digest");

    note("They reseal the edited block to get a fresh digest.");
    let resealed = verdant_ledger::Block::new(
        forged[2].index,
        forged[2].timestamp,
        forged[2].payload.clone(),
        forged[2].previous_hash.clone(),
    )
    .expect("payload is encodable");
    forged[2] = resealed;

    assert!(forged[2].verify(), "resealed block is self-consistent");
    assert!(!validate_blocks(&forged));
    alert("Block 3 still links to the old digest, the forgery is visible");
    ok("History cannot be rewritten without breaking a link");

    step(6, "Summary");
    field("Records sealed", "3 (+ genesis)");
    field("Labels verified", "1 hit, 1 exact-match miss");
    field("Forgeries caught", "2 (payload edit, reseal with stale link)");
    field("Hash function", "SHA-256 (sha2)");
    field("Payload encoding", "canonical length-prefixed bytes");
    println!();
    println!(
        "  {BOLD}{GREEN}Demo finished in {:.2}s{RESET}",
        t0.elapsed().as_secs_f64()
    );
    println!();
}
