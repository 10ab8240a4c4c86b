use std::path::Path;

use anyhow::Result;

/// Execute the `connectors` command: list definitions in presentation order.
pub fn execute(settings: Option<&Path>) -> Result<()> {
    let dispatcher = super::dispatcher(settings)?;

    for variant in dispatcher.variants() {
        let definitions = variant.registry().list();
        if definitions.is_empty() {
            continue;
        }
        println!("{}:", variant.name());
        for def in definitions {
            match &def.image {
                Some(image) => println!("  {} ({})  [{}]", def.title, def.id, image),
                None => println!("  {} ({})", def.title, def.id),
            }
            println!("    uid: {}", def.uid);
            if let Some(url) = &def.documentation_url {
                println!("    docs: {url}");
            }
        }
    }

    if dispatcher.registry().is_empty() {
        println!("No destinations registered.");
    }

    Ok(())
}
