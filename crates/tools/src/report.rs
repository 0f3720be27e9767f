//! Master financial report: the sectioned fact sheet embedded in the system
//! framing whenever a conversation has an active entity.

use crate::data::EntitySnapshot;

const DESCRIPTION_CHARS: usize = 300;

/// Indian notation for rupee amounts: crore, lakh, thousand.
pub fn format_inr(value: Option<f64>) -> String {
    let Some(v) = value else {
        return "N/A".into();
    };
    let abs = v.abs();
    if abs >= 1e7 {
        format!("₹{:.2} Cr", v / 1e7)
    } else if abs >= 1e5 {
        format!("₹{:.2} L", v / 1e5)
    } else if abs >= 1e3 {
        format!("₹{:.2} K", v / 1e3)
    } else {
        format!("₹{v:.2}")
    }
}

/// Rounded to two decimals, trailing zeros dropped.
fn num(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{}{suffix}", (v * 100.0).round() / 100.0),
        None => "N/A".into(),
    }
}

fn opt(value: Option<&str>) -> &str {
    value.filter(|s| !s.trim().is_empty()).unwrap_or("N/A")
}

pub fn master_report(symbol: &str, snapshot: Option<&EntitySnapshot>) -> String {
    let Some(s) = snapshot else {
        return format!("No data available for {symbol}.");
    };
    let f = &s.fundamentals;
    let sh = s.shareholding.clone().unwrap_or_default();

    let description: String = opt(s.company.description.as_deref())
        .chars()
        .take(DESCRIPTION_CHARS)
        .collect();

    let lines = [
        format!("=== MASTER REPORT: {} ===", s.symbol),
        format!(
            "Company: {} | Sector: {}",
            opt(s.company.name.as_deref()),
            opt(s.company.sector.as_deref())
        ),
        format!(
            "Current Price: ₹{} | Day Change: {}",
            num(s.quote.price, ""),
            num(s.quote.change_percent, "%")
        ),
        format!("Business: {description}"),
        String::new(),
        "--- 1. VALUATION METRICS ---".into(),
        format!(
            "Market Cap: {} | Enterprise Value: {}",
            format_inr(f.market_cap),
            format_inr(f.enterprise_value)
        ),
        format!(
            "Trailing P/E: {} | Forward P/E: {}",
            num(f.trailing_pe, ""),
            num(f.forward_pe, "")
        ),
        format!("PEG Ratio: {}", num(f.peg_ratio, "")),
        format!(
            "Price/Book: {} | Price/Sales: {}",
            num(f.price_to_book, ""),
            num(f.price_to_sales, "")
        ),
        String::new(),
        "--- 2. PROFITABILITY & EFFICIENCY ---".into(),
        format!(
            "Gross Margin: {} | Operating Margin: {}",
            num(f.gross_margin, "%"),
            num(f.operating_margin, "%")
        ),
        format!("Net Profit Margin: {}", num(f.net_margin, "%")),
        format!(
            "ROE: {} | ROA: {}",
            num(f.return_on_equity, "%"),
            num(f.return_on_assets, "%")
        ),
        String::new(),
        "--- 3. GROWTH & OPERATIONS ---".into(),
        format!("Revenue (TTM): {}", format_inr(f.revenue)),
        format!(
            "Revenue Growth: {} | Earnings Growth: {}",
            num(f.revenue_growth, "%"),
            num(f.earnings_growth, "%")
        ),
        format!("EBITDA: {}", format_inr(f.ebitda)),
        String::new(),
        "--- 4. BALANCE SHEET HEALTH ---".into(),
        format!(
            "Total Cash: {} | Total Debt: {}",
            format_inr(f.total_cash),
            format_inr(f.total_debt)
        ),
        format!("Debt/Equity: {}", num(f.debt_to_equity, "")),
        format!(
            "Current Ratio: {} | Quick Ratio: {}",
            num(f.current_ratio, ""),
            num(f.quick_ratio, "")
        ),
        String::new(),
        "--- 5. CASH FLOW ---".into(),
        format!("Operating Cash Flow: {}", format_inr(f.operating_cashflow)),
        format!("Free Cash Flow: {}", format_inr(f.free_cashflow)),
        String::new(),
        "--- 6. RISK PROFILE ---".into(),
        format!("Beta: {} (1.0 moves with the market)", num(f.beta, "")),
        format!("Short Ratio: {}", num(f.short_ratio, "")),
        format!("52-Wk Change: {}", num(f.week52_change, "%")),
        String::new(),
        "--- 7. SHAREHOLDING ---".into(),
        format!(
            "Promoters: {} | Public: {}",
            num(sh.promoters, "%"),
            num(sh.public, "%")
        ),
        format!(
            "FII (Foreign): {} | DII (Domestic): {}",
            num(sh.fii, "%"),
            num(sh.dii, "%")
        ),
        String::new(),
        "--- 8. ANALYST VIEW ---".into(),
        format!("Target Mean Price: ₹{}", num(f.target_mean_price, "")),
        format!(
            "Recommendation: {}",
            opt(f.recommendation_key.as_deref()).to_uppercase()
        ),
        format!(
            "Analyst Count: {}",
            f.number_of_analyst_opinions
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".into())
        ),
    ];
    lines.join("\n")
}
