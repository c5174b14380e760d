//! The `ielts band` command.

use anyhow::Result;

use ielts_core::band::estimate_band;

pub fn execute(module: String, raw: u32) -> Result<()> {
    println!("{:.1}", estimate_band(&module, raw));
    Ok(())
}
