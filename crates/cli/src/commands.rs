//! Implementations of the `init`/`status`/`ping` subcommands.

use std::path::Path;

use txm_core::Result;
use txm_engine::Catalog;

pub fn init(dir: &Path) -> Result<()> {
    let catalog = Catalog::new(dir);
    catalog.enable()?;
    catalog.disable(false)?;
    println!("initialized catalog at {}", dir.display());
    Ok(())
}

pub fn status(dir: &Path) -> Result<()> {
    let catalog = Catalog::new(dir);
    let enabled = catalog.enable()?;
    if !enabled {
        println!("catalog at {} failed to enable", dir.display());
        return Ok(());
    }
    println!("last_committed = {}", catalog.last_committed());
    catalog.disable(false)?;
    Ok(())
}

pub fn ping(dir: &Path) -> Result<()> {
    let catalog = Catalog::new(dir);
    if !catalog.enable()? {
        println!("catalog at {} failed to enable", dir.display());
        return Ok(());
    }
    let write_id = catalog.begin("txmgr-cli", "ping")?;
    let committed = catalog.commit(write_id)?;
    println!("ping committed = {committed}, last_committed = {}", catalog.last_committed());
    catalog.disable(false)?;
    Ok(())
}
