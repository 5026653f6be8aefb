use clap::{Parser, Subcommand, ValueEnum};
use leafdb::{ChangeEvent, CollectionQuery, Format, Store, StoreConfig};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::process;

/// leafdb CLI: read, write and watch a leafdb data directory
#[derive(Parser)]
#[command(name = "leafdb", version, about)]
struct Cli {
    /// Path to the data directory (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// YAML config file; --root and --format override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage format of record files
    #[arg(long)]
    format: Option<StorageFormat>,

    /// Output format
    #[arg(long, default_value = "json")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StorageFormat {
    Json,
    Yaml,
}

impl From<StorageFormat> for Format {
    fn from(format: StorageFormat) -> Self {
        match format {
            StorageFormat::Json => Format::Json,
            StorageFormat::Yaml => Format::Yaml,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Get a single record by ID
    Get {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },

    /// List records in a collection, oldest first unless sorted
    List {
        /// Field filters (e.g. --where status=done)
        #[arg(long = "where", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
        /// Sort by a top-level field
        #[arg(long)]
        sort_by: Option<String>,
        /// Reverse the sort order
        #[arg(long, requires = "sort_by")]
        desc: bool,
        /// Collection name
        collection: String,
    },

    /// Create or replace a record
    Put {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
        /// Field values (e.g. --field title="Buy milk")
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete a record
    Delete {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },

    /// Print the collection every time its directory changes
    Watch {
        /// Field filters (e.g. --where status=done)
        #[arg(long = "where", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
        /// Collection name
        collection: String,
    },

    /// Print each creation, change and deletion of one record
    WatchObject {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid key=value pair: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> leafdb::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(format) = cli.format {
        config.format = format.into();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    log::debug!("Opening store at {}", config.root.display());
    let store = Store::open(config)?;

    match cli.command {
        Command::Get { collection, id } => {
            let record = store
                .object_query::<Value>(&collection, &id)?
                .execute()
                .ok_or_else(|| format!("Record not found: {collection}/{id}"))?;
            print_output(&record, cli.output)?;
        }

        Command::List {
            filters,
            sort_by,
            desc,
            collection,
        } => {
            let mut query = with_filters(store.collection_query(&collection)?, filters);
            if let Some(field) = sort_by {
                query = query.sort(move |a, b| {
                    let ordering = compare_values(&a[&field], &b[&field]);
                    if desc {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
            print_output(&Value::Array(query.execute()), cli.output)?;
        }

        Command::Put {
            collection,
            id,
            fields,
        } => {
            let data = fields_to_value(&fields);
            store.put(&collection, &id, &data)?;
            print_output(&serde_json::json!({ "ok": true, "id": id }), cli.output)?;
        }

        Command::Delete { collection, id } => {
            store.remove(&collection, &id)?;
            print_output(&serde_json::json!({ "ok": true, "deleted": id }), cli.output)?;
        }

        Command::Watch {
            filters,
            collection,
        } => {
            let query = with_filters(store.collection_query(&collection)?, filters);
            for snapshot in query.observe()? {
                print_output(&Value::Array(snapshot), cli.output)?;
            }
        }

        Command::WatchObject { collection, id } => {
            for change in store.object_query::<Value>(&collection, &id)?.observe()? {
                let event = match change {
                    ChangeEvent::Created(record) => {
                        serde_json::json!({ "event": "created", "record": record })
                    }
                    ChangeEvent::Changed(record) => {
                        serde_json::json!({ "event": "changed", "record": record })
                    }
                    ChangeEvent::Deleted => serde_json::json!({ "event": "deleted", "id": id }),
                };
                print_output(&event, cli.output)?;
            }
        }
    }

    Ok(())
}

fn with_filters(
    query: CollectionQuery<Value>,
    filters: Vec<(String, String)>,
) -> CollectionQuery<Value> {
    if filters.is_empty() {
        return query;
    }
    let expected: Vec<(String, Value)> = filters
        .into_iter()
        .map(|(key, val)| (key, parse_field(&val)))
        .collect();
    query.filter(move |record| {
        expected
            .iter()
            .all(|(key, val)| record.get(key) == Some(val))
    })
}

/// Order JSON values: numbers numerically, strings lexically, anything else
/// by its serialized form. Missing fields sort first.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn print_output(value: &Value, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

/// Try each value as JSON (numbers, booleans, arrays, objects), falling back
/// to a plain string.
fn parse_field(val: &str) -> Value {
    serde_json::from_str(val).unwrap_or_else(|_| Value::String(val.to_string()))
}

fn fields_to_value(fields: &[(String, String)]) -> Value {
    let mut map = serde_json::Map::new();
    for (key, val) in fields {
        map.insert(key.clone(), parse_field(val));
    }
    Value::Object(map)
}
