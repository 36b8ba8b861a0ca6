//! Command-line front end. Every command validates its input, talks to the
//! [`TransactionStore`], and prints a read-only projection.

mod format;

use anyhow::{Context, Result};
use chrono::Local;
use rust_decimal::RoundingStrategy;
use std::io::Write;
use std::path::PathBuf;

use crate::config::expand_home;
use crate::export;
use crate::models::{
    categories_for, find_category, parse_budget_limit, NewTransaction, TransactionKind,
    EXPENSE_CATEGORIES,
};
use crate::store::TransactionStore;
use crate::summary::Period;

use format::{format_amount, format_limit, progress_bar, truncate};

pub fn run(args: &[String], store: &mut TransactionStore, out: &mut dyn Write) -> Result<()> {
    let Some(command) = args.get(1) else {
        print_usage(out)?;
        return Ok(());
    };
    let rest = &args[2..];
    match command.as_str() {
        "add" | "a" => cli_add(rest, store, out),
        "delete" | "rm" => cli_delete(rest, store, out),
        "budget" => cli_budget(rest, store, out),
        "budgets" => cli_budgets(store, out),
        "list" | "ls" => cli_list(rest, store, out),
        "summary" | "s" => cli_summary(rest, store, out),
        "export" => cli_export(rest, store, out),
        "categories" => cli_categories(out),
        "--help" | "-h" | "help" => print_usage(out),
        "--version" | "-V" | "version" => {
            writeln!(out, "pocket-ledger {}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => {
            print_usage(out)?;
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Pocket Ledger - local-only income and expense tracker")?;
    writeln!(out)?;
    writeln!(out, "Usage: pocket-ledger <command>")?;
    writeln!(out)?;
    writeln!(out, "Commands:")?;
    writeln!(out, "  add <expense|income> <amount> <category>  Record a transaction")?;
    writeln!(out, "    --note <text>                         Optional note")?;
    writeln!(out, "  delete <id>                             Delete a transaction")?;
    writeln!(out, "  budget <category> <amount>              Set a monthly limit (0 clears it)")?;
    writeln!(out, "  budgets                                 Budget usage for this month")?;
    writeln!(out, "  list [expense|income]                   List transactions, newest first")?;
    writeln!(out, "  summary [--month|--year|--all]          Totals and category breakdown")?;
    writeln!(out, "  export [path] [--month|--year|--all]    Export transactions to CSV")?;
    writeln!(out, "  categories                              Show the category lists")?;
    writeln!(out, "  --help, -h                              Show this help")?;
    writeln!(out, "  --version, -V                           Show version")?;
    Ok(())
}

/// Value following `--flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// The last `--month`/`--year`/`--all` flag, or `default`.
fn period_flag(args: &[String], default: Period) -> Period {
    args.iter()
        .filter(|a| a.starts_with("--"))
        .filter_map(|a| Period::parse(a))
        .last()
        .unwrap_or(default)
}

/// Positional arguments, skipping `--flag value` pairs and bare period flags.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut result = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--note" {
            iter.next();
        } else if !arg.starts_with("--") {
            result.push(arg.as_str());
        }
    }
    result
}

fn resolve_category(kind: TransactionKind, name: &str) -> Result<&'static str> {
    find_category(kind, name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown {kind} category '{name}'. Choose one of: {}",
            categories_for(kind).join(", ")
        )
    })
}

fn cli_add(args: &[String], store: &mut TransactionStore, out: &mut dyn Write) -> Result<()> {
    let pos = positionals(args);
    let [kind, amount, category, ..] = pos.as_slice() else {
        anyhow::bail!("Usage: pocket-ledger add <expense|income> <amount> <category> [--note <text>]");
    };
    let kind = TransactionKind::parse(kind)
        .ok_or_else(|| anyhow::anyhow!("Type must be 'expense' or 'income', got '{kind}'"))?;
    let category = resolve_category(kind, category)?;
    let note = flag_value(args, "--note");

    let new = NewTransaction::parse(kind, amount, category, note)?;
    let amount = new.amount;
    let id = store.add_transaction(new);
    writeln!(
        out,
        "Added {kind} of {} in {category} ({id})",
        format_amount(amount)
    )?;
    Ok(())
}

fn cli_delete(args: &[String], store: &mut TransactionStore, out: &mut dyn Write) -> Result<()> {
    let Some(id) = args.first() else {
        anyhow::bail!("Usage: pocket-ledger delete <id>");
    };
    if store.delete_transaction(id) {
        writeln!(out, "Deleted {id}")?;
    } else {
        writeln!(out, "No transaction with id {id}")?;
    }
    Ok(())
}

fn cli_budget(args: &[String], store: &mut TransactionStore, out: &mut dyn Write) -> Result<()> {
    let [category, amount, ..] = args else {
        anyhow::bail!("Usage: pocket-ledger budget <category> <amount>");
    };
    let category = resolve_category(TransactionKind::Expense, category)?;
    let limit = parse_budget_limit(amount)?;
    store.set_category_budget(category, limit);
    if limit.is_zero() {
        writeln!(out, "Cleared budget for {category}")?;
    } else {
        writeln!(out, "Budget for {category}: {} / month", format_amount(limit))?;
    }
    Ok(())
}

fn cli_budgets(store: &TransactionStore, out: &mut dyn Write) -> Result<()> {
    let now = Local::now();
    writeln!(out, "Budgets - {}", Period::Month.label(&now))?;
    writeln!(out, "{}", "─".repeat(60))?;
    for row in store.budget_report_at(&now) {
        let marker = if row.over_budget { " OVER" } else { "" };
        let bar = if row.limit.is_some() {
            progress_bar(row.progress, 20)
        } else {
            String::new()
        };
        writeln!(
            out,
            "  {:<16} {:>12} / {:<12} {bar}{marker}",
            truncate(&row.category, 16),
            format_amount(row.spent),
            format_limit(row.limit),
        )?;
    }
    Ok(())
}

fn cli_list(args: &[String], store: &TransactionStore, out: &mut dyn Write) -> Result<()> {
    let kind = positionals(args)
        .first()
        .map(|k| {
            TransactionKind::parse(k)
                .ok_or_else(|| anyhow::anyhow!("Type must be 'expense' or 'income', got '{k}'"))
        })
        .transpose()?;
    let period = period_flag(args, Period::All);
    let now = Local::now();

    let rows: Vec<_> = store
        .recent(kind)
        .into_iter()
        .filter(|t| period.contains(&t.date, &now))
        .collect();
    if rows.is_empty() {
        writeln!(out, "No transactions yet")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<36} {:<10} {:<14} {:>12}  Note",
        "ID", "Date", "Category", "Amount"
    )?;
    writeln!(out, "{}", "─".repeat(90))?;
    for txn in rows {
        writeln!(
            out,
            "{:<36} {:<10} {:<14} {:>12}  {}",
            txn.id,
            txn.date.with_timezone(&Local).format("%Y-%m-%d"),
            truncate(&txn.category, 14),
            format_amount(txn.signed_amount()),
            truncate(txn.note_or_empty(), 30),
        )?;
    }
    Ok(())
}

fn cli_summary(args: &[String], store: &TransactionStore, out: &mut dyn Write) -> Result<()> {
    let period = period_flag(args, Period::Month);
    let now = Local::now();
    let totals = store.totals_at(period, &now);
    let count = store.in_period_at(period, &now).len();

    writeln!(out, "Pocket Ledger - {}", period.label(&now))?;
    writeln!(out, "{}", "─".repeat(40))?;
    writeln!(out, "  Income:     {}", format_amount(totals.income))?;
    writeln!(out, "  Expenses:   {}", format_amount(totals.expense))?;
    writeln!(out, "  Net:        {}", format_amount(totals.net()))?;
    writeln!(out, "  Txns:       {count}")?;

    for kind in TransactionKind::all() {
        let ranked = totals.ranked(*kind);
        if ranked.is_empty() {
            continue;
        }
        writeln!(out)?;
        let heading = match kind {
            TransactionKind::Expense => "Spending by Category:",
            TransactionKind::Income => "Income by Category:",
        };
        writeln!(out, "{heading}")?;
        for (name, amount) in ranked {
            let share = totals
                .share(*kind, name)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            writeln!(out, "  {name:<24} {:>12} {share:>4}%", format_amount(amount))?;
        }
    }
    Ok(())
}

fn cli_export(args: &[String], store: &TransactionStore, out: &mut dyn Write) -> Result<()> {
    let period = period_flag(args, Period::All);
    let output_path = positionals(args)
        .first()
        .map(|p| PathBuf::from(expand_home(p, std::env::var("HOME").ok().as_deref())))
        .unwrap_or_else(|| PathBuf::from("transactions.csv"));

    let now = Local::now();
    let rows: Vec<_> = store
        .in_period_at(period, &now)
        .into_iter()
        .cloned()
        .collect();
    if rows.is_empty() {
        writeln!(out, "No transactions to export")?;
        return Ok(());
    }
    let count = export::export_to_path(&output_path, &rows)
        .with_context(|| format!("Export to {} failed", output_path.display()))?;
    writeln!(
        out,
        "Exported {count} transactions to {}",
        output_path.display()
    )?;
    Ok(())
}

fn cli_categories(out: &mut dyn Write) -> Result<()> {
    for kind in TransactionKind::all() {
        writeln!(out, "{kind}: {}", categories_for(*kind).join(", "))?;
    }
    writeln!(out, "Budgets apply to: {}", EXPENSE_CATEGORIES.join(", "))?;
    Ok(())
}
