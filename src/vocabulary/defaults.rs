//! Built-in catalogs seeded into new repositories.

pub const COUNTRIES: &[(&str, &str)] = &[
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("HU", "Hungary"),
    ("IE", "Ireland"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("LU", "Luxembourg"),
    ("MX", "Mexico"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PE", "Peru"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("SE", "Sweden"),
    ("TR", "Turkey"),
    ("US", "United States"),
    ("UY", "Uruguay"),
    ("ZA", "South Africa"),
];

pub const PURPOSES: &[(&str, &str)] = &[
    ("AGR", "Agreement"),
    ("CER", "Certificate"),
    ("CON", "Contract"),
    ("INF", "Information"),
    ("INV", "Invoice"),
    ("LET", "Letter"),
    ("MIN", "Minutes"),
    ("NOT", "Notification"),
    ("OFF", "Offer"),
    ("ORD", "Order"),
    ("REC", "Receipt"),
    ("REP", "Report"),
    ("REQ", "Request"),
    ("TAX", "Tax"),
];
