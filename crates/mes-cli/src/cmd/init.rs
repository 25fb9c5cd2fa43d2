use crate::context::Context;
use anyhow::Context as _;

/// Write a default config file (unless one exists) and create the database.
pub fn run(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let path = &ctx.config_path;
    if path.exists() && !force {
        println!("  exists:  {}", path.display());
    } else {
        ctx.config
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("  created: {}", path.display());
    }

    ctx.open_db()?;
    println!("  database: {}", ctx.config.database.path.display());

    if ctx.config.models.dir.is_dir() {
        println!("  models:   {}", ctx.config.models.dir.display());
    } else {
        println!(
            "  models:   {} (missing; orders will be created without predictions)",
            ctx.config.models.dir.display()
        );
    }
    Ok(())
}
