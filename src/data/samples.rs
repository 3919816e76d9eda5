use chrono::{Duration, NaiveDate};

// ---------------------------------------------------------------------------
// Built-in sample datasets
// ---------------------------------------------------------------------------

/// Demo tables generated from a fixed seed, so every run produces the same
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDataset {
    /// Daily sales per region: ISO dates, currency, yes/no flags.
    Sales,
    /// Expense ledger: currency amounts, vendors, payment methods.
    Expenses,
    /// Workout log: US-style dates, a few missing heart-rate readings.
    Fitness,
    /// Daily page traffic: `05 Jan 2024` dates, rates, optional campaigns.
    WebAnalytics,
}

impl SampleDataset {
    pub const ALL: [SampleDataset; 4] = [
        SampleDataset::Sales,
        SampleDataset::Expenses,
        SampleDataset::Fitness,
        SampleDataset::WebAnalytics,
    ];

    pub fn filename(self) -> &'static str {
        match self {
            SampleDataset::Sales => "sales.csv",
            SampleDataset::Expenses => "expenses.csv",
            SampleDataset::Fitness => "fitness.csv",
            SampleDataset::WebAnalytics => "web-analytics.csv",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SampleDataset::Sales => "E-commerce sales with products, regions and revenue",
            SampleDataset::Expenses => {
                "Company expense tracking with categories, vendors and payment methods"
            }
            SampleDataset::Fitness => "Workout log with exercise types, duration and heart rate",
            SampleDataset::WebAnalytics => {
                "Website traffic with page views, user behavior and conversion metrics"
            }
        }
    }

    /// Render the sample as CSV text.
    pub fn to_csv(self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        match self {
            SampleDataset::Sales => write_sales(&mut writer)?,
            SampleDataset::Expenses => write_expenses(&mut writer)?,
            SampleDataset::Fitness => write_fitness(&mut writer)?,
            SampleDataset::WebAnalytics => write_web_analytics(&mut writer)?,
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn write_sales(writer: &mut csv::Writer<Vec<u8>>) -> Result<(), csv::Error> {
    let mut rng = SampleRng::new(42);
    let regions = ["North", "South", "East", "West"];
    let products = [("Widget", 12.5), ("Gadget", 24.0), ("Gizmo", 7.25)];

    writer.write_record([
        "date", "region", "product", "units", "unit_price", "revenue", "returned",
    ])?;
    for day in 0..60 {
        let date = start_date() + Duration::days(day / 2);
        let region = regions[rng.below(regions.len())];
        let (product, price) = products[rng.below(products.len())];
        let units = 1 + rng.below(40);
        let revenue = units as f64 * price;
        let returned = if rng.next_f64() < 0.1 { "yes" } else { "no" };
        writer.write_record([
            date.format("%Y-%m-%d").to_string(),
            region.to_string(),
            product.to_string(),
            units.to_string(),
            format!("${price:.2}"),
            format!("{revenue:.2}"),
            returned.to_string(),
        ])?;
    }
    Ok(())
}

fn write_fitness(writer: &mut csv::Writer<Vec<u8>>) -> Result<(), csv::Error> {
    let mut rng = SampleRng::new(7);
    let workouts = ["Running", "Cycling", "Swimming", "Yoga", "Strength"];

    writer.write_record([
        "date", "workout", "duration_min", "calories", "avg_heart_rate", "completed",
    ])?;
    for day in 0..50 {
        let date = start_date() + Duration::days(day);
        let workout = workouts[rng.below(workouts.len())];
        let duration = 20 + rng.below(70);
        let calories = rng.gauss(8.0, 1.5).max(3.0) * duration as f64;
        // Roughly one reading in eight is missing.
        let heart_rate = if rng.next_f64() < 0.125 {
            String::new()
        } else {
            format!("{:.0}", rng.gauss(135.0, 12.0))
        };
        let completed = rng.next_f64() > 0.15;
        writer.write_record([
            date.format("%m/%d/%Y").to_string(),
            workout.to_string(),
            duration.to_string(),
            format!("{calories:.0}"),
            heart_rate,
            completed.to_string(),
        ])?;
    }
    Ok(())
}

fn write_expenses(writer: &mut csv::Writer<Vec<u8>>) -> Result<(), csv::Error> {
    let mut rng = SampleRng::new(19);
    let categories = [
        ("Travel", ["Delta Air Lines", "Hilton", "Uber"]),
        ("Office Supplies", ["Staples", "Amazon", "Office Depot"]),
        ("Software", ["Atlassian", "GitHub", "Adobe"]),
        ("Meals", ["Chipotle", "Starbucks", "Panera"]),
        ("Utilities", ["Comcast", "PG&E", "Verizon"]),
    ];
    let methods = ["Corporate Card", "Bank Transfer", "Check", "Cash"];
    let departments = ["Engineering", "Sales", "Marketing", "Operations"];
    let employees = ["A. Rivera", "B. Chen", "C. Okafor", "D. Novak", "E. Haddad"];

    writer.write_record([
        "date",
        "category",
        "vendor",
        "department",
        "employee",
        "amount",
        "tax",
        "total",
        "payment_method",
        "reimbursed",
    ])?;
    for i in 0..50 {
        let date = start_date() + Duration::days(i * 3 + rng.below(3) as i64);
        let (category, vendors) = categories[rng.below(categories.len())];
        let amount = rng.gauss(180.0, 90.0).max(9.99);
        let tax = amount * 0.08;
        let reimbursed = if rng.next_f64() < 0.7 { "yes" } else { "no" };
        writer.write_record([
            date.format("%Y-%m-%d").to_string(),
            category.to_string(),
            vendors[rng.below(vendors.len())].to_string(),
            departments[rng.below(departments.len())].to_string(),
            employees[rng.below(employees.len())].to_string(),
            format!("${amount:.2}"),
            format!("{tax:.2}"),
            format!("{:.2}", amount + tax),
            methods[rng.below(methods.len())].to_string(),
            reimbursed.to_string(),
        ])?;
    }
    Ok(())
}

fn write_web_analytics(writer: &mut csv::Writer<Vec<u8>>) -> Result<(), csv::Error> {
    let mut rng = SampleRng::new(2024);
    let pages = ["/", "/pricing", "/blog", "/docs", "/signup"];
    let sources = ["organic", "direct", "referral", "social", "email"];
    let devices = ["desktop", "mobile", "tablet"];
    let countries = ["US", "DE", "GB", "IN", "BR"];
    let campaigns = ["spring_launch", "newsletter", "retargeting"];

    writer.write_record([
        "date",
        "page",
        "traffic_source",
        "device",
        "country",
        "page_views",
        "unique_visitors",
        "new_visitors",
        "avg_session_sec",
        "bounce_rate",
        "pages_per_session",
        "conversions",
        "conversion_rate",
        "revenue",
        "campaign",
    ])?;
    for day in 0..50 {
        let date = start_date() + Duration::days(day);
        let page_views = 200 + rng.below(1800);
        let unique = page_views * (55 + rng.below(35)) / 100;
        let new_visitors = unique * (20 + rng.below(50)) / 100;
        let conversions = rng.below(8) + page_views / 400;
        let revenue = conversions as f64 * rng.gauss(49.0, 12.0).max(5.0);
        // About a third of the days run no campaign.
        let campaign = if rng.next_f64() < 0.35 {
            String::new()
        } else {
            campaigns[rng.below(campaigns.len())].to_string()
        };
        writer.write_record([
            date.format("%d %b %Y").to_string(),
            pages[rng.below(pages.len())].to_string(),
            sources[rng.below(sources.len())].to_string(),
            devices[rng.below(devices.len())].to_string(),
            countries[rng.below(countries.len())].to_string(),
            page_views.to_string(),
            unique.to_string(),
            new_visitors.to_string(),
            format!("{:.0}", rng.gauss(140.0, 45.0).max(5.0)),
            format!("{:.3}", 0.25 + rng.next_f64() * 0.5),
            format!("{:.2}", page_views as f64 / unique.max(1) as f64),
            conversions.to_string(),
            format!("{:.4}", conversions as f64 / unique.max(1) as f64),
            format!("{revenue:.2}"),
            campaign,
        ])?;
    }
    Ok(())
}

/// Seeded xoshiro256** stream for the sample tables. The state is filled
/// with splitmix64 so that nearby seeds still give unrelated rows.
struct SampleRng {
    state: [u64; 4],
}

impl SampleRng {
    fn new(seed: u64) -> Self {
        let mut x = seed;
        let state = std::array::from_fn(|_| {
            x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = x;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^ (z >> 31)
        });
        SampleRng { state }
    }

    fn next_u64(&mut self) -> u64 {
        let [a, b, c, d] = &mut self.state;
        let result = b.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = *b << 17;
        *c ^= *a;
        *d ^= *b;
        *b ^= *c;
        *a ^= *d;
        *c ^= t;
        *d = d.rotate_left(45);
        result
    }

    /// In `[0, 1)`, from the top 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Pick an index for a slice of length `n`. `n` must be non-zero; the
    /// result is clamped so rounding never reaches `n`.
    fn below(&mut self, n: usize) -> usize {
        ((self.next_f64() * n as f64) as usize).min(n - 1)
    }

    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(f64::MIN_POSITIVE);
        let u2 = self.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        mean + std_dev * radius * (std::f64::consts::TAU * u2).cos()
    }
}
