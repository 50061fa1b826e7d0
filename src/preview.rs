use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, inference::TablePreview, io_utils, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let raw = io_utils::read_raw_table_from_path(&args.input, delimiter, encoding)?;
    let preview = TablePreview::from_table(&raw, args.rows);

    if args.table {
        println!("signature: {}", preview.signature);
        table::print_table(&preview.headers, &preview.rows);
    } else {
        println!("{}", preview.to_json()?);
    }
    info!(
        "Sampled {} of {} row(s) from {:?}",
        preview.rows.len(),
        preview.total_rows,
        args.input
    );
    Ok(())
}
