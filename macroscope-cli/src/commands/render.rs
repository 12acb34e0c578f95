use std::path::Path;

use crate::commands::common::load_module;

pub fn run(path: &Path) -> anyhow::Result<()> {
    let module = load_module(path)?;
    print!("{}", module.render());
    Ok(())
}
