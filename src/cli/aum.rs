use super::ui;
use crate::core::aggregate::{self, AumTable};
use crate::core::config::AppConfig;
use crate::core::{Concept, Currency, Period, PeriodIndex};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell};
use std::fmt;
use std::fs;
use std::str::FromStr;
use tracing::info;

/// Which AUM breakdown to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    MutualFunds,
    ThirdParty,
    /// Mutual funds plus third-party mandates, per institution.
    Active,
}

impl TableKind {
    const ALL: [TableKind; 3] = [
        TableKind::MutualFunds,
        TableKind::ThirdParty,
        TableKind::Active,
    ];

    fn title(&self) -> &'static str {
        match self {
            TableKind::MutualFunds => "Mutual Fund Investments",
            TableKind::ThirdParty => "Third-Party Mandates",
            TableKind::Active => "Total Active Management",
        }
    }

    fn file_stem(&self) -> &'static str {
        match self {
            TableKind::MutualFunds => "fondos_mutuos",
            TableKind::ThirdParty => "mandatos",
            TableKind::Active => "gestion_activa",
        }
    }

    fn category_headers(&self) -> Vec<&'static str> {
        match self {
            TableKind::MutualFunds => vec!["Mutual Funds"],
            TableKind::ThirdParty => vec!["Third-Party Mandates"],
            TableKind::Active => vec!["Mutual Funds", "Third-Party Mandates", "Active Total"],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableKind::MutualFunds => "mutual-funds",
            TableKind::ThirdParty => "third-party",
            TableKind::Active => "active",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TableKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mutual-funds" => Ok(TableKind::MutualFunds),
            "third-party" => Ok(TableKind::ThirdParty),
            "active" => Ok(TableKind::Active),
            other => anyhow::bail!(
                "Unknown table `{other}`; expected mutual-funds, third-party or active"
            ),
        }
    }
}

pub struct AumOptions {
    pub period: Option<String>,
    pub table: Option<TableKind>,
    pub currency: Currency,
    pub csv: bool,
    pub list_periods: bool,
}

pub fn run(config: &AppConfig, options: &AumOptions) -> Result<()> {
    let store = RecordStore::load(&config.database_path)?;
    let index = PeriodIndex::new(store.records());

    if options.list_periods {
        for period in index.periods() {
            println!("{period}");
        }
        return Ok(());
    }

    let period = match &options.period {
        Some(s) => s.parse::<Period>()?,
        None => index.latest().context("Database contains no records")?,
    };
    let records = index.records_for(period);
    if records.is_empty() {
        anyhow::bail!("No records for period {period}");
    }

    let mutual_funds = aggregate::aggregate(&records, Concept::MutualFunds, options.currency);
    let third_party = aggregate::aggregate(&records, Concept::ThirdPartyMandates, options.currency);
    let total = aggregate::aggregate(&records, Concept::TotalAssets, options.currency);

    let kinds: Vec<TableKind> = match options.table {
        Some(kind) => vec![kind],
        None => TableKind::ALL.to_vec(),
    };

    println!(
        "\nAUM by Afore, {} ({} millions)",
        ui::style_text(&period.to_string(), ui::StyleType::Title),
        options.currency
    );

    for (i, kind) in kinds.iter().enumerate() {
        let table = match kind {
            TableKind::MutualFunds => AumTable::build(&total, &[&mutual_funds]),
            TableKind::ThirdParty => AumTable::build(&total, &[&third_party]),
            TableKind::Active => {
                let active = aggregate::combine(&[&mutual_funds, &third_party]);
                AumTable::build(&total, &[&mutual_funds, &third_party, &active])
            }
        };

        println!(
            "\n{}",
            ui::style_text(kind.title(), ui::StyleType::TotalLabel)
        );
        display_table(&table, &kind.category_headers());

        if options.csv {
            let path = write_csv(config, *kind, period, options.currency, &table)?;
            info!("Wrote {}", path.display());
        }
        if i < kinds.len() - 1 {
            ui::print_separator();
        }
    }

    Ok(())
}

fn display_table(table: &AumTable, category_headers: &[&str]) {
    let mut out = ui::new_styled_table();

    let mut header = vec![ui::header_cell("Afore"), ui::header_cell("Total Assets")];
    for name in category_headers {
        header.push(ui::header_cell(name));
    }
    header.push(ui::header_cell("% of Total"));
    out.set_header(header);

    for row in &table.rows {
        let is_total = row.institution == aggregate::TOTAL_ROW;
        let mut name_cell = Cell::new(&row.institution);
        if is_total {
            name_cell = name_cell.add_attribute(Attribute::Bold);
        }

        let mut cells = vec![name_cell, ui::money_cell(row.total)];
        for value in &row.categories {
            cells.push(ui::money_cell(*value));
        }
        cells.push(ui::percent_cell(row.pct_of_total));
        out.add_row(cells);
    }

    println!("{out}");
}

fn write_csv(
    config: &AppConfig,
    kind: TableKind,
    period: Period,
    currency: Currency,
    table: &AumTable,
) -> Result<std::path::PathBuf> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let mut contents = format!("Afore,Total Assets ({currency})");
    for name in kind.category_headers() {
        contents.push(',');
        contents.push_str(name);
        contents.push_str(&format!(" ({currency})"));
    }
    contents.push_str(",% of Total\n");

    for row in &table.rows {
        contents.push_str(&row.institution);
        contents.push_str(&format!(",{:.2}", row.total));
        for value in &row.categories {
            contents.push_str(&format!(",{value:.2}"));
        }
        contents.push_str(&format!(",{:.2}\n", row.pct_of_total));
    }

    let suffix = match currency {
        Currency::Usd => "",
        Currency::Mxn => "_mxn",
    };
    let path = config.output_dir.join(format!(
        "{}{}_{}_{}.csv",
        kind.file_stem(),
        suffix,
        period.year_str(),
        period.month_str()
    ));
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write CSV: {}", path.display()))?;
    Ok(path)
}
