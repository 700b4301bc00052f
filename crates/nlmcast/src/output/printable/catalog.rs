//! Printable implementations for Catalog and FamilyRecord.

use std::io::Write;

use crate::catalog::Catalog;
use crate::netlink::genl::FamilyRecord;
use crate::output::{OutputOptions, Printable, PrintableList};

const SEPARATOR: &str = "------------------------------------------------------------------";

impl Printable for FamilyRecord {
    fn print_text<W: Write>(&self, w: &mut W, opts: &OutputOptions) -> std::io::Result<()> {
        writeln!(w, "{}", SEPARATOR)?;
        if opts.hex {
            writeln!(
                w,
                "Family: {}, ID: {:#x}, Version: {}",
                self.name, self.id, self.version
            )?;
        } else {
            writeln!(
                w,
                "Family: {}, ID: {}, Version: {}",
                self.name, self.id, self.version
            )?;
        }

        if self.mcast_groups.is_empty() {
            return writeln!(w, "No multicast groups");
        }

        writeln!(w, "Multicast groups:")?;
        for group in &self.mcast_groups {
            writeln!(w, "({}, {})", group.name, group.id)?;
        }

        Ok(())
    }

    fn to_json(&self) -> serde_json::Value {
        let groups: Vec<_> = self
            .mcast_groups
            .iter()
            .map(|g| serde_json::json!({ "name": g.name, "id": g.id }))
            .collect();

        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "version": self.version,
            "mcast_groups": groups,
        })
    }
}

impl PrintableList for Catalog {
    type Item = FamilyRecord;

    fn items(&self) -> &[FamilyRecord] {
        self.families()
    }
}
