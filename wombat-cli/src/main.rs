use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use wombat_core::catalog::{read_items, write_items};
use wombat_core::mods::ModScanner;
use wombat_core::store::{CatalogDomain, CatalogStore};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("wombat")
        .about("Catalog and mod tooling for map block authoring")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(
            Arg::new("project")
                .long("project")
                .help("Project root holding Editor/Settings (defaults to the current directory)")
                .value_name("DIR")
                .global(true),
        )
        .subcommand(
            Command::new("catalog")
                .about("Inspect and maintain the persisted catalogs")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("List a catalog grouped by category and subcategory")
                        .arg(domain_arg()),
                )
                .subcommand(
                    Command::new("import")
                        .about("Merge an external catalog file into a catalog")
                        .arg(domain_arg())
                        .arg(
                            Arg::new("file")
                                .help("Catalog file to merge in")
                                .value_name("FILE")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("export")
                        .about("Write a catalog to a shareable file")
                        .arg(domain_arg())
                        .arg(
                            Arg::new("file")
                                .help("Destination file")
                                .value_name("FILE")
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("restore")
                        .about("Reset a catalog to the bundled default")
                        .arg(domain_arg()),
                ),
        )
        .subcommand(
            Command::new("scan")
                .about("Scan installed mods and merge their models and flats into the catalogs")
                .arg(
                    Arg::new("mods")
                        .help("Directory containing installed mods")
                        .value_name("MODS_DIR")
                        .required(true),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Print what would be merged without touching the catalogs")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let project = match matches.get_one::<String>("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let mut store = CatalogStore::in_project(&project);
    log::debug!("Using settings at {}", store.settings_dir().display());
    store.load_all();

    match matches.subcommand() {
        Some(("catalog", sub_matches)) => match sub_matches.subcommand() {
            Some(("list", args)) => list(&store, domain_of(args)?),
            Some(("import", args)) => import(&mut store, domain_of(args)?, file_of(args))?,
            Some(("export", args)) => export(&store, domain_of(args)?, file_of(args))?,
            Some(("restore", args)) => {
                let domain = domain_of(args)?;
                store.catalog_mut(domain).restore_default()?;
                println!(
                    "Restored the {} catalog to the bundled default ({} items)",
                    domain_name(domain),
                    store.catalog(domain).list().len()
                );
            }
            _ => unreachable!(),
        },
        Some(("scan", args)) => scan(
            &mut store,
            PathBuf::from(args.get_one::<String>("mods").unwrap()),
            args.get_flag("dry-run"),
        )?,
        _ => unreachable!(),
    }
    Ok(())
}

fn domain_arg() -> Arg {
    Arg::new("domain")
        .help("Which catalog: models, flats or buildings")
        .value_name("DOMAIN")
        .required(true)
}

fn domain_of(args: &ArgMatches) -> anyhow::Result<CatalogDomain> {
    let value = args.get_one::<String>("domain").unwrap();
    match value.as_str() {
        "models" => Ok(CatalogDomain::Models),
        "flats" => Ok(CatalogDomain::Flats),
        "buildings" => Ok(CatalogDomain::Buildings),
        other => Err(anyhow::anyhow!(
            "unknown catalog domain {:?}, expected models, flats or buildings",
            other
        )),
    }
}

fn domain_name(domain: CatalogDomain) -> &'static str {
    match domain {
        CatalogDomain::Models => "models",
        CatalogDomain::Flats => "flats",
        CatalogDomain::Buildings => "buildings",
    }
}

fn file_of(args: &ArgMatches) -> PathBuf {
    PathBuf::from(args.get_one::<String>("file").unwrap())
}

fn list(store: &CatalogStore, domain: CatalogDomain) {
    let catalog = store.catalog(domain);

    let mut categories: Vec<_> = catalog.categories().keys().collect();
    categories.sort();
    for category in categories {
        println!("{}", category);
        let mut subcategories: Vec<_> = catalog.categories()[category].iter().collect();
        subcategories.sort();
        for subcategory in subcategories {
            if subcategory != &format!("{}_root", category) {
                println!("  {}", subcategory);
            }
            let mut ids: Vec<_> = catalog.subcategories()[subcategory].iter().collect();
            ids.sort();
            for id in ids {
                if let Some(item) = catalog.get(id) {
                    println!("    {} [{}]", item.label, item.id);
                }
            }
        }
    }
    println!("{} items total", catalog.list().len());
}

fn import(store: &mut CatalogStore, domain: CatalogDomain, file: PathBuf) -> anyhow::Result<()> {
    let before = store.catalog(domain).list().len();
    match domain {
        // Buildings files may carry replacement templates alongside the list.
        CatalogDomain::Buildings => store.import_buildings(&file)?,
        _ => {
            let items = read_items(&file)?;
            store.catalog_mut(domain).merge(items)?;
        }
    }
    let after = store.catalog(domain).list().len();
    println!(
        "Imported {} into the {} catalog ({} new, {} total)",
        file.display(),
        domain_name(domain),
        after - before,
        after
    );
    Ok(())
}

fn export(store: &CatalogStore, domain: CatalogDomain, file: PathBuf) -> anyhow::Result<()> {
    match domain {
        CatalogDomain::Buildings => store.export_buildings(&file)?,
        _ => write_items(&file, store.catalog(domain).list())?,
    }
    println!(
        "Exported the {} catalog to {}",
        domain_name(domain),
        file.display()
    );
    Ok(())
}

fn scan(store: &mut CatalogStore, mods_dir: PathBuf, dry_run: bool) -> anyhow::Result<()> {
    let scanner = ModScanner::dev(&mods_dir);
    let models = scanner.catalog_models();
    let flats = scanner.catalog_flats();

    if dry_run {
        for item in models.iter().chain(flats.iter()) {
            println!("{}  ({})", item.id, item.subcategory);
        }
        println!(
            "Found {} models and {} flats (dry run, catalogs untouched)",
            models.len(),
            flats.len()
        );
        return Ok(());
    }

    let model_count = models.len();
    let flat_count = flats.len();
    store.models.merge(models)?;
    store.flats.merge(flats)?;
    println!(
        "Merged {} models and {} flats from {}",
        model_count,
        flat_count,
        mods_dir.display()
    );
    Ok(())
}
