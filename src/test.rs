//! Shared test utilities: token layouts, sample documents and a throwaway recon home.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::extract::{Page, Token, TokenDump};
use crate::Config;
use std::path::PathBuf;
use tempfile::TempDir;

const ROW_HEIGHT: f64 = 8.0;
const ROW_PITCH: f64 = 12.0;
const TOKEN_WIDTH: f64 = 20.0;

/// Builds a page of tokens one row at a time, top to bottom.
pub struct TokenRows {
    top: f64,
    tokens: Vec<Token>,
}

impl TokenRows {
    pub fn new() -> Self {
        Self {
            top: 40.0,
            tokens: Vec::new(),
        }
    }

    /// A row of tokens, each starting at the given `x0`.
    pub fn cells(&mut self, cells: &[(f64, &str)]) -> &mut Self {
        for (x0, text) in cells {
            self.tokens.push(Token::new(
                *text,
                *x0,
                x0 + TOKEN_WIDTH,
                self.top,
                self.top + ROW_HEIGHT,
            ));
        }
        self.top += ROW_PITCH;
        self
    }

    /// A free text row starting at the left margin, one token per word.
    pub fn line(&mut self, words: &[&str]) -> &mut Self {
        let cells: Vec<(f64, &str)> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (10.0 + 40.0 * i as f64, *w))
            .collect();
        self.cells(&cells)
    }

    /// A data row under `header_row`'s columns.
    pub fn data(&mut self, code: &str, name: &str, value: &str) -> &mut Self {
        self.cells(&[(10.0, code), (60.0, name), (300.0, value)])
    }

    pub fn page(&self, number: usize) -> Page {
        Page::new(number, self.tokens.clone())
    }
}

/// The column titles of a payroll summary table.
pub fn header_row(rows: &mut TokenRows) {
    rows.cells(&[
        (10.0, "Código"),
        (60.0, "Evento"),
        (200.0, "Quantidade"),
        (300.0, "Valor"),
        (400.0, "Funcionários"),
    ]);
}

/// Two pages: a "Folha Complementar" table with an addition and a deduction, then a "Férias"
/// table on the next page.
pub fn sample_summary() -> Vec<Page> {
    let mut first = TokenRows::new();
    first.line(&["Empresa", "Exemplo", "Ltda"]);
    first.line(&["Folha", "Complementar"]);
    header_row(&mut first);
    first.data("+003", "Salário Base", "1.234,56");
    first.data("-310", "INSS", "200,00");
    first.cells(&[(10.0, "Totais"), (300.0, "1.034,56")]);

    let mut second = TokenRows::new();
    second.line(&["Férias"]);
    header_row(&mut second);
    second.data("005", "Férias", "1.000,00");
    second.cells(&[(10.0, "Líquidos"), (300.0, "1.000,00")]);

    vec![first.page(1), second.page(2)]
}

/// `sample_summary` as a token dump document.
pub fn sample_summary_json() -> String {
    serde_json::to_string(&TokenDump::new(sample_summary())).unwrap()
}

/// A mapping document that covers the events of `sample_summary`.
pub const SAMPLE_MAPPING: &str = r#"{
    "Folha": [
        { "evento": "003", "codigo_lancamento": "30055", "tipo": "Adicional" },
        { "evento": "310", "codigo_lancamento": "30058", "tipo": "Desconto" }
    ],
    "Férias": [
        { "evento": "005", "codigo_lancamento": "40023", "tipo": "Adicional" }
    ],
    "Rescisão": []
}"#;

/// A ledger export matching `sample_summary` within a cent, plus one code no mapping declares.
pub const SAMPLE_LEDGER: &str = "\
1;30055;01/2025;1.234,55;C;0;0;Salário base
2;30058;01/2025;200,00;D;0;0;INSS segurados
3;40023;01/2025;1.000,00;C;0;0;Férias
4;99999;01/2025;50,00;D;0;0;Ajuste manual
";

/// A recon home in a temporary directory, with the sample mapping installed in it and the sample
/// documents written next to it. Holds the `TempDir` so the files live as long as the test.
pub struct TestEnv {
    temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mapping_source = temp_dir.path().join("mapping_source.json");
        std::fs::write(&mapping_source, SAMPLE_MAPPING).unwrap();
        let root = temp_dir.path().join("payroll-recon");
        let config = Config::create(&root, Some(&mapping_source)).await.unwrap();
        Self::with_documents(temp_dir, config)
    }

    /// Same documents, but a recon home without a mapping and no mapping anywhere else.
    pub async fn without_mapping() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("payroll-recon");
        let config = Config::create(&root, None).await.unwrap();
        Self::with_documents(temp_dir, config)
    }

    fn with_documents(temp_dir: TempDir, config: Config) -> Self {
        std::fs::write(temp_dir.path().join("resumo.json"), sample_summary_json()).unwrap();
        std::fs::write(temp_dir.path().join("lote.txt"), SAMPLE_LEDGER).unwrap();

        Self { temp_dir, config }
    }

    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// A path in the temporary directory, outside the recon home.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.path("resumo.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.path("lote.txt")
    }
}
