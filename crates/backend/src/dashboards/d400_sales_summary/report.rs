use contracts::dashboards::d400_sales_summary::{GroupSummary, SalesSummary};

use crate::shared::format::{format_amount, format_number};

fn print_rows(title: &str, rows: &[GroupSummary], columns: &[Column]) {
    println!("\n{}", title);
    let mut header = format!("  {:<28}", "group");
    for column in columns {
        header.push_str(&format!(" {:>16}", column.title()));
    }
    println!("{}", header);
    for row in rows {
        let mut line = format!("  {:<28}", row.label());
        for column in columns {
            line.push_str(&format!(" {:>16}", column.render(row)));
        }
        println!("{}", line);
    }
}

#[derive(Debug, Clone, Copy)]
enum Column {
    TotalSales,
    AvgPrice,
    AvgQuantity,
    TotalQuantity,
    Count,
}

impl Column {
    fn title(&self) -> &'static str {
        match self {
            Column::TotalSales => "total_sales",
            Column::AvgPrice => "avg_price",
            Column::AvgQuantity => "avg_quantity",
            Column::TotalQuantity => "total_quantity",
            Column::Count => "count",
        }
    }

    fn render(&self, row: &GroupSummary) -> String {
        match self {
            Column::TotalSales => format_amount(row.total_sales),
            Column::AvgPrice => format_amount(row.avg_price),
            Column::AvgQuantity => format_amount(row.avg_quantity),
            Column::TotalQuantity => format_number(row.total_quantity),
            Column::Count => format_number(row.count),
        }
    }
}

/// Вывод результатов анализа таблицами в консоль
pub fn print_summary(heading: &str, summary: &SalesSummary) {
    let global = &summary.global;
    println!("\n=== {} ===", heading);
    println!("  records:       {}", format_number(global.record_count));
    println!("  total revenue: {}", format_amount(global.total_revenue));
    println!("  avg price:     {}", format_amount(global.avg_price));
    println!("  avg quantity:  {}", format_amount(global.avg_quantity));

    print_rows(
        "Sales by category",
        &summary.by_category,
        &[Column::TotalSales, Column::AvgPrice, Column::TotalQuantity],
    );
    print_rows(
        "Sales by region",
        &summary.by_region,
        &[Column::TotalSales, Column::AvgQuantity],
    );
    print_rows(
        "Sales by quarter",
        &summary.by_quarter,
        &[Column::TotalSales, Column::AvgQuantity],
    );
    print_rows(
        "Top category x region combinations",
        &summary.by_category_region[..summary.by_category_region.len().min(5)],
        &[Column::TotalSales, Column::Count],
    );
}
