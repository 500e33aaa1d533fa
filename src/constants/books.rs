use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{AppError, AppResult};

/// Chapter key used when a request covers the whole book.
pub const ENTIRE_BOOK: &str = "entire-book";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookInfo {
    pub category: &'static str,
    pub book_name: &'static str,
    pub file_id: &'static str,
    pub description: &'static str,
    pub chapters: &'static [&'static str],
}

impl BookInfo {
    /// Pending or placeholder file ids cannot back generation.
    pub fn is_available(&self) -> bool {
        !self.file_id.is_empty() && self.file_id != "pending" && !self.file_id.starts_with("[TBD")
    }
}

const POLITY_CHAPTERS: &[&str] = &[
    "Historical Background",
    "Making of the Constitution",
    "Salient Features of the Constitution",
    "Preamble of the Constitution",
    "Union and its Territory",
    "Citizenship",
    "Fundamental Rights",
    "Directive Principles of State Policy",
    "Fundamental Duties",
    "Amendment of the Constitution",
    "Basic Structure of the Constitution",
    "Parliamentary System",
    "Federal System",
    "Centre-State Relations",
    "Emergency Provisions",
    "President",
    "Vice-President",
    "Prime Minister",
    "Central Council of Ministers",
    "Parliament",
    "Supreme Court",
    "Judicial Review",
    "Governor",
    "Chief Minister",
    "High Court",
    "Panchayati Raj",
    "Municipalities",
    "Election Commission",
    "Comptroller and Auditor General of India",
    "Attorney General of India",
];

const ECONOMY_CHAPTERS: &[&str] = &[
    "Introduction",
    "Growth, Development and Happiness",
    "Inflation and Business Cycle",
    "Agriculture and Food Management",
    "Industry and Infrastructure",
    "Banking in India",
    "Financial Market",
    "Public Finance in India",
    "External Sector in India",
];

const SPECTRUM_CHAPTERS: &[&str] = &[
    "Sources for the History of Modern India",
    "Major Approaches to the History of Modern India",
    "Advent of the Europeans in India",
    "India on the Eve of British Conquest",
    "Expansion and Consolidation of British Power in India",
    "People's Resistance Against British Before 1857",
    "The Revolt of 1857",
    "Socio-Religious Reform Movements",
    "Indian National Movement 1858-1905",
    "Non-Cooperation Movement and Khilafat Aandolan",
    "Civil Disobedience Movement and Round Table Conferences",
    "Quit India Movement",
];

const ENVIRONMENT_CHAPTERS: &[&str] = &[
    "Ecology",
    "Functions of an Ecosystem",
    "Terrestrial Ecosystem",
    "Aquatic Ecosystem",
    "Biodiversity",
    "Climate Change",
    "Environmental Pollution",
    "Protected Area Network",
];

pub static BOOKS: &[BookInfo] = &[
    BookInfo {
        category: "TamilnaduHistory",
        book_name: "Tamilnadu History Book",
        file_id: "file-UyQKVs91xYHfadeHSjdDw2",
        description: "Published by Tamilnadu Government, covering Indian history",
        chapters: &[],
    },
    BookInfo {
        category: "Spectrum",
        book_name: "Spectrum Book",
        file_id: "file-UwRi9bH3uhVh4YBXNbMv1w",
        description: "Spectrum book for Modern Indian History",
        chapters: SPECTRUM_CHAPTERS,
    },
    BookInfo {
        category: "ArtAndCulture",
        book_name: "Nitin Singhania Art and Culture Book",
        file_id: "file-Gn3dsACNC2MP2xS9QeN3Je",
        description: "Nitin Singhania book for Indian Art and Culture",
        chapters: &[],
    },
    BookInfo {
        category: "FundamentalGeography",
        book_name: "NCERT Class 11th Fundamentals of Physical Geography",
        file_id: "file-CMWSg6udmgtVZpNS3tDGHW",
        description: "NCERT Class 11th book on Fundamental Geography",
        chapters: &[],
    },
    BookInfo {
        category: "IndianGeography",
        book_name: "NCERT Class 11th Indian Geography",
        file_id: "file-U1nQNyCotU2kcSgF6hrarT",
        description: "NCERT Class 11th book on Indian Geography",
        chapters: &[],
    },
    BookInfo {
        category: "Atlas",
        book_name: "Atlas",
        file_id: "pending",
        description: "General knowledge or internet-based (file pending)",
        chapters: &[],
    },
    BookInfo {
        category: "Science",
        book_name: "Disha IAS Previous Year Papers (Science Section)",
        file_id: "file-TGgc65bHqVMxpmj5ULyR6K",
        description: "Disha IAS book, Science section (Physics, Chemistry, Biology, Science & Technology)",
        chapters: &[],
    },
    BookInfo {
        category: "Environment",
        book_name: "Shankar IAS Environment Book",
        file_id: "file-Yb1cfrHMATDNQgyUa6jDqw",
        description: "Shankar IAS book for Environment",
        chapters: ENVIRONMENT_CHAPTERS,
    },
    BookInfo {
        category: "Economy",
        book_name: "Ramesh Singh Indian Economy Book",
        file_id: "file-TJ5Djap1uv4fZeyM5c6sKU",
        description: "Ramesh Singh book for Indian Economy",
        chapters: ECONOMY_CHAPTERS,
    },
    BookInfo {
        category: "EconomicSurvey2025",
        book_name: "Economic Survey 2025",
        file_id: "[TBD - Economic Survey file ID]",
        description: "Government of India Economic Survey 2024-25",
        chapters: &[],
    },
    BookInfo {
        category: "CSAT",
        book_name: "Disha IAS Previous Year Papers (CSAT Section)",
        file_id: "file-TGgc65bHqVMxpmj5ULyR6K",
        description: "Disha IAS book, CSAT section",
        chapters: &[],
    },
    BookInfo {
        category: "CurrentAffairs",
        book_name: "Vision IAS Current Affairs Magazine",
        file_id: "file-5BX6sBLZ2ws44NBUTbcyWg",
        description: "Vision IAS Current Affairs resource",
        chapters: &[],
    },
    BookInfo {
        category: "PreviousYearPaper",
        book_name: "Disha IAS Previous Year Papers",
        file_id: "file-TGgc65bHqVMxpmj5ULyR6K",
        description: "Disha IAS book for Previous Year Papers",
        chapters: &[],
    },
    BookInfo {
        category: "Polity",
        book_name: "Laxmikanth Book",
        file_id: "file-G15UzpuvCRuMG4g6ShCgFK",
        description: "Laxmikanth book for Indian Polity",
        chapters: POLITY_CHAPTERS,
    },
];

static QUERY_CHAPTER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)generate\s+\d+\s+mcqs?\s+from\s+(.+)\s+of\s+the\s+")
        .expect("QUERY_CHAPTER_REGEX is a valid regex pattern")
});

static CHAPTER_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^chapter\s*\d+\s*[:.\-]?\s*")
        .expect("CHAPTER_PREFIX_REGEX is a valid regex pattern")
});

pub fn find_book(category: &str) -> Option<&'static BookInfo> {
    BOOKS.iter().find(|book| book.category == category)
}

/// Looks up the book for a category, rejecting unknown categories and books whose
/// reference file is not uploaded yet.
pub fn resolve_book(category: &str) -> AppResult<&'static BookInfo> {
    let book = find_book(category).ok_or_else(|| {
        AppError::Configuration(format!(
            "Invalid category: {}. Please provide a valid subject category.",
            category
        ))
    })?;

    if !book.is_available() {
        return Err(AppError::Configuration(format!(
            "File for category {} is not available (File ID: {}). MCQs cannot be generated.",
            category, book.file_id
        )));
    }

    Ok(book)
}

/// Pulls the chapter out of queries such as `Generate 1 MCQ from Preamble of the Laxmikanth Book`.
pub fn chapter_from_query(query: &str) -> Option<String> {
    QUERY_CHAPTER_REGEX
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|chapter| !chapter.is_empty())
}

/// Maps a requested chapter onto the catalog spelling. Unknown chapters are kept as
/// given (whitespace collapsed); a missing chapter means the whole book.
pub fn canonical_chapter(book: &BookInfo, requested: Option<&str>) -> String {
    let Some(raw) = requested else {
        return ENTIRE_BOOK.to_string();
    };

    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(ENTIRE_BOOK) {
        return ENTIRE_BOOK.to_string();
    }

    let without_prefix = CHAPTER_PREFIX_REGEX.replace(&cleaned, "").to_string();

    book.chapters
        .iter()
        .find(|chapter| {
            chapter.eq_ignore_ascii_case(&cleaned) || chapter.eq_ignore_ascii_case(&without_prefix)
        })
        .map(|chapter| chapter.to_string())
        .unwrap_or(cleaned)
}
