//! Command implementations. Each writes its human-readable result to `out`.

use std::io::Write;

use anyhow::{bail, Result};
use clap::Args;

use shelfstore_core::record::{join_locations, join_machines};
use shelfstore_core::{Inventory, Movement, NewProduct, Product, Session};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Catalog key (defaults to the suggested next key)
    #[arg(long)]
    pub key: Option<String>,

    /// Product name
    #[arg(long)]
    pub name: String,

    /// Internal code
    #[arg(long = "code")]
    pub internal_code: String,

    /// Color (one of the configured palette, e.g. Neutro, Bianco)
    #[arg(long)]
    pub color: String,

    /// Manufacturer
    #[arg(long)]
    pub manufacturer: String,

    /// Container type
    #[arg(long = "container")]
    pub container_type: String,

    /// Machine numbers, comma separated (e.g. 1,2,3,4)
    #[arg(long)]
    pub machines: String,

    /// Locations, comma separated (e.g. "Stanza 1,Stanza 2")
    #[arg(long)]
    pub locations: String,
}

pub fn whoami(session: &Session, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{} ({})", session.user_id(), session.role())?;
    Ok(())
}

pub fn suggest_key(
    inventory: &Inventory,
    session: &Session,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "{}", inventory.suggest_key(session)?)?;
    Ok(())
}

pub fn add(
    inventory: &Inventory,
    session: &Session,
    args: AddArgs,
    out: &mut impl Write,
) -> Result<()> {
    let key = match args.key {
        Some(key) => key,
        None => inventory.suggest_key(session)?,
    };
    let form = NewProduct {
        key,
        name: args.name,
        internal_code: args.internal_code,
        color: args.color,
        manufacturer: args.manufacturer,
        container_type: args.container_type,
        machines: args.machines,
        locations: args.locations,
    };
    let product = inventory.add_product(session, &form)?;
    writeln!(out, "Product {} saved.", product.key)?;
    Ok(())
}

pub fn list(
    inventory: &Inventory,
    session: &Session,
    all: bool,
    out: &mut impl Write,
) -> Result<()> {
    let products = if all {
        inventory.list(session)?
    } else {
        inventory.recent(session)?
    };
    if products.is_empty() {
        writeln!(out, "No products saved yet.")?;
        return Ok(());
    }
    write_products(&products, out)
}

pub fn show(
    inventory: &Inventory,
    session: &Session,
    key: &str,
    out: &mut impl Write,
) -> Result<()> {
    let Some(product) = inventory.get(session, key)? else {
        bail!("no product with key {}", key);
    };
    writeln!(out, "key:            {}", product.key)?;
    writeln!(out, "name:           {}", product.name)?;
    writeln!(out, "internal code:  {}", product.internal_code)?;
    writeln!(out, "color:          {}", product.color)?;
    writeln!(out, "manufacturer:   {}", product.manufacturer)?;
    writeln!(out, "container type: {}", product.container_type)?;
    writeln!(out, "machines:       {}", join_machines(&product.machines))?;
    writeln!(out, "locations:      {}", product.locations.join(", "))?;
    Ok(())
}

pub fn move_locations(
    inventory: &Inventory,
    session: &Session,
    key: &str,
    locations: &str,
    out: &mut impl Write,
) -> Result<()> {
    let movement = inventory.update_locations(session, key, locations)?;
    writeln!(
        out,
        "Locations of {} updated: {} -> {} (recorded {}).",
        movement.key, movement.previous_locations, movement.new_locations, movement.timestamp
    )?;
    Ok(())
}

pub fn delete(
    inventory: &Inventory,
    session: &Session,
    key: &str,
    yes: bool,
    out: &mut impl Write,
) -> Result<()> {
    if !yes {
        bail!("refusing to delete {} without --yes", key);
    }
    inventory.delete_product(session, key)?;
    writeln!(out, "Product {} deleted from the catalog.", key)?;
    Ok(())
}

pub fn history(
    inventory: &Inventory,
    session: &Session,
    key: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let movements = inventory.movements(session, key)?;
    if movements.is_empty() {
        writeln!(out, "No movements recorded.")?;
        return Ok(());
    }
    write_movements(&movements, out)
}

fn write_products(products: &[Product], out: &mut impl Write) -> Result<()> {
    let rows: Vec<[String; 8]> = products
        .iter()
        .map(|p| {
            [
                p.key.clone(),
                p.name.clone(),
                p.internal_code.clone(),
                p.color.clone(),
                p.manufacturer.clone(),
                p.container_type.clone(),
                join_machines(&p.machines),
                join_locations(&p.locations),
            ]
        })
        .collect();
    let header = [
        "KEY",
        "NAME",
        "CODE",
        "COLOR",
        "MANUFACTURER",
        "CONTAINER",
        "MACHINES",
        "LOCATIONS",
    ];
    write_table(&header, &rows, out)
}

fn write_movements(movements: &[Movement], out: &mut impl Write) -> Result<()> {
    let rows: Vec<[String; 4]> = movements
        .iter()
        .map(|m| {
            [
                m.timestamp.clone(),
                m.key.clone(),
                m.previous_locations.clone(),
                m.new_locations.clone(),
            ]
        })
        .collect();
    write_table(&["TIMESTAMP", "KEY", "FROM", "TO"], &rows, out)
}

/// Left-aligned columns, two spaces apart.
fn write_table<const N: usize>(
    header: &[&str; N],
    rows: &[[String; N]],
    out: &mut impl Write,
) -> Result<()> {
    let mut widths = [0usize; N];
    for (width, h) in widths.iter_mut().zip(header) {
        *width = h.chars().count();
    }
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(out, "{}", pad_line(header, &widths))?;
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        writeln!(out, "{}", pad_line(&cells, &widths))?;
    }
    Ok(())
}

fn pad_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    padded.join("  ").trim_end().to_string()
}
