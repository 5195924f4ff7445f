//! Interactive CLI demo of a full VENDO purchase lifecycle.
//!
//! Walks through provisioning a catalog, feeding coins, buying a beverage,
//! hitting the failure paths, and restoring stock with an admin reset. The
//! output uses ANSI escape codes for colored, storytelling-style terminal
//! rendering.
//!
//! Run with:
//!   cargo run --example demo

use vendo_machine::inventory::Inventory;
use vendo_machine::machine::{DispenseOutcome, VendingMachine};
use vendo_machine::store::JsonStore;

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                    {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    VENDO  --  Vending Machine Lifecycle Demo       {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                    {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]========================================{RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn note(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn show_catalog(machine: &VendingMachine) {
    for (id, item) in machine.inventory().iter() {
        println!(
            "     {GREEN}slot {id}{RESET}  {:<16} price {YELLOW}{}{RESET}  stock {}",
            item.name, item.price, item.stock
        );
    }
}

// ---------------------------------------------------------------------------
// Demo
// ---------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    banner();

    section(1, "Provision the machine");
    let dir = tempfile::tempdir()?;
    let store = JsonStore::new(dir.path().join("beverages.json"));
    let mut machine = VendingMachine::provision(store, Inventory::seed())?;
    note("seed catalog written to a fresh snapshot file");
    show_catalog(&machine);

    section(2, "Feed coins");
    for _ in 0..3 {
        let balance = machine.insert_coin(1);
        note(&format!("coin in, balance now {balance}"));
    }
    note("a slug (value 25) falls straight through:");
    let balance = machine.insert_coin(25);
    note(&format!("balance still {balance}"));

    section(3, "Buy a cola (slot 1, price 2)");
    match machine.dispense(1)? {
        DispenseOutcome::Vended {
            change, remaining, ..
        } => {
            println!("     {GREEN}*clunk*{RESET} one cola, {change} coin(s) change, {remaining} left");
        }
        other => println!("     unexpected outcome: {other:?}"),
    }
    note(&format!("machine keeps nothing: balance is {}", machine.coins()));

    section(4, "The failure paths");
    machine.insert_coin(1);
    match machine.dispense(99)? {
        DispenseOutcome::NotAvailable { balance } => {
            note(&format!("slot 99 doesn't exist -- balance kept at {balance}"));
        }
        other => println!("     unexpected outcome: {other:?}"),
    }
    match machine.dispense(4)? {
        DispenseOutcome::InsufficientFunds { balance } => {
            note(&format!("cold brew costs 3, we have {balance} -- no sale"));
        }
        other => println!("     unexpected outcome: {other:?}"),
    }
    let returned = machine.eject_coins();
    note(&format!("eject returns the {returned} held coin(s)"));

    section(5, "Admin reset");
    machine.reset_inventory(Inventory::seed())?;
    note("catalog restored to seeded stock:");
    show_catalog(&machine);

    println!();
    println!("{BOLD}{GREEN}  Demo complete.{RESET}");
    println!();
    Ok(())
}
