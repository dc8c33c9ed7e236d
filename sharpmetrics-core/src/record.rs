//! Flat metric records, one per class or method
//!
//! Field order and serde names define the CSV header.

use crate::metrics::{ClassRaw, MethodRaw};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A record that can be written as one CSV row or one console line
pub trait MetricRecord: Serialize + DeserializeOwned + fmt::Display {
    /// Column names, in field order
    const HEADER: &'static [&'static str];

    /// Name of the measured class or method
    fn subject(&self) -> &str;
}

/// Class-level metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassMetrics {
    pub class_name: String,
    pub cloc: usize,
    pub celoc: usize,
    pub nmd: usize,
    pub nad: usize,
    pub nmd_nad: usize,
    pub wmc: usize,
    pub wmc_no_case: usize,
    pub lcom: usize,
    pub lcom3: f64,
    pub lcom4: usize,
    pub tcc: f64,
    pub atfd: usize,
    pub cnor: usize,
    pub cnol: usize,
    pub cnoc: usize,
    pub cnoa: usize,
    pub nopm: usize,
    pub nopf: usize,
    pub cmnb: usize,
    pub rfc: usize,
    pub cbo: usize,
    pub dit: usize,
    pub dcc: usize,
    pub atfd10: usize,
    pub nic: usize,
    pub woc: f64,
    pub nopa: usize,
    pub nopp: usize,
    pub wmcnamm: usize,
    pub bur: f64,
    #[serde(rename = "BOvR")]
    pub bovr: f64,
}

impl ClassMetrics {
    pub fn new(class_name: String, raw: ClassRaw) -> Self {
        ClassMetrics {
            class_name,
            cloc: raw.cloc,
            celoc: raw.celoc,
            nmd: raw.nmd,
            nad: raw.nad,
            nmd_nad: raw.nmd_nad,
            wmc: raw.wmc,
            wmc_no_case: raw.wmc_no_case,
            lcom: raw.lcom,
            lcom3: raw.lcom3,
            lcom4: raw.lcom4,
            tcc: raw.tcc,
            atfd: raw.atfd,
            cnor: raw.cnor,
            cnol: raw.cnol,
            cnoc: raw.cnoc,
            cnoa: raw.cnoa,
            nopm: raw.nopm,
            nopf: raw.nopf,
            cmnb: raw.cmnb,
            rfc: raw.rfc,
            cbo: raw.cbo,
            dit: raw.dit,
            dcc: raw.dcc,
            atfd10: raw.atfd10,
            nic: raw.nic,
            woc: raw.woc,
            nopa: raw.nopa,
            nopp: raw.nopp,
            wmcnamm: raw.wmcnamm,
            bur: raw.bur,
            bovr: raw.bovr,
        }
    }
}

impl MetricRecord for ClassMetrics {
    const HEADER: &'static [&'static str] = &[
        "ClassName", "Cloc", "Celoc", "Nmd", "Nad", "NmdNad", "Wmc", "WmcNoCase", "Lcom", "Lcom3",
        "Lcom4", "Tcc", "Atfd", "Cnor", "Cnol", "Cnoc", "Cnoa", "Nopm", "Nopf", "Cmnb", "Rfc",
        "Cbo", "Dit", "Dcc", "Atfd10", "Nic", "Woc", "Nopa", "Nopp", "Wmcnamm", "Bur", "BOvR",
    ];

    fn subject(&self) -> &str {
        &self.class_name
    }

}

/// Method-level metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MethodMetrics {
    /// Fully qualified: `Namespace.Class.Method`
    pub method_name: String,
    pub cyclo: usize,
    pub cyclo_switch: usize,
    pub mloc: usize,
    pub meloc: usize,
    pub nop: usize,
    pub nolv: usize,
    pub notc: usize,
    pub mnol: usize,
    pub mnor: usize,
    pub mnoc: usize,
    pub mnoa: usize,
    pub nonl: usize,
    pub nosl: usize,
    pub nomo: usize,
    pub nope: usize,
    pub nole: usize,
    pub mmnb: usize,
    pub nouw: usize,
    pub aid: f64,
    pub atfd: usize,
    /// Externally supplied label, when an annotation matched
    pub label: Option<i64>,
}

impl MethodMetrics {
    pub fn new(method_name: String, raw: MethodRaw, label: Option<i64>) -> Self {
        MethodMetrics {
            method_name,
            cyclo: raw.cyclo,
            cyclo_switch: raw.cyclo_switch,
            mloc: raw.mloc,
            meloc: raw.meloc,
            nop: raw.nop,
            nolv: raw.nolv,
            notc: raw.notc,
            mnol: raw.mnol,
            mnor: raw.mnor,
            mnoc: raw.mnoc,
            mnoa: raw.mnoa,
            nonl: raw.nonl,
            nosl: raw.nosl,
            nomo: raw.nomo,
            nope: raw.nope,
            nole: raw.nole,
            mmnb: raw.mmnb,
            nouw: raw.nouw,
            aid: raw.aid,
            atfd: raw.atfd,
            label,
        }
    }
}

impl MetricRecord for MethodMetrics {
    const HEADER: &'static [&'static str] = &[
        "MethodName", "Cyclo", "CycloSwitch", "Mloc", "Meloc", "Nop", "Nolv", "Notc", "Mnol",
        "Mnor", "Mnoc", "Mnoa", "Nonl", "Nosl", "Nomo", "Nope", "Nole", "Mmnb", "Nouw", "Aid",
        "Atfd", "Label",
    ];

    fn subject(&self) -> &str {
        &self.method_name
    }

}

/// `<Kind>: <subject>, COLUMN: value, ...`
///
/// Values come from the record's serde form, looked up by column name.
fn write_line<R: MetricRecord>(record: &R, kind: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Value::Object(fields) = serde_json::to_value(record).map_err(|_| fmt::Error)? else {
        return Err(fmt::Error);
    };
    write!(f, "{}: {}", kind, record.subject())?;
    for column in R::HEADER.iter().skip(1) {
        match fields.get(*column) {
            Some(Value::String(text)) => write!(f, ", {}: {}", column.to_uppercase(), text)?,
            Some(Value::Null) | None => write!(f, ", {}: ", column.to_uppercase())?,
            Some(value) => write!(f, ", {}: {}", column.to_uppercase(), value)?,
        }
    }
    Ok(())
}

impl fmt::Display for ClassMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(self, "Class", f)
    }
}

impl fmt::Display for MethodMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(self, "Method", f)
    }
}
