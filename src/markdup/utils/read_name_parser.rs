use crate::utils::errors::Error;

use super::physical_location::PhysicalLocation;

// Illumina read names come in 3 varieties: 5, 7 and 8 ':' separated fields. For 5 and 7
// field names the last three fields are tile, x and y. 8 field names carry a UMI after y.
pub(crate) const ILLUMINA_READ_NAME_5_FIELDS: usize = 5;
pub(crate) const ILLUMINA_READ_NAME_5_FIELDS_TILE_FIELD: usize = 2;
pub(crate) const ILLUMINA_READ_NAME_7_FIELDS: usize = 7;
pub(crate) const ILLUMINA_READ_NAME_7_FIELDS_TILE_FIELD: usize = 4;
pub(crate) const ILLUMINA_READ_NAME_8_FIELDS: usize = 8;
pub(crate) const ILLUMINA_READ_NAME_8_FIELDS_TILE_FIELD: usize = 4;

const GENEMIND_TILE_NAME_LEN: usize = 8;

/**
 * Parses the physical location out of an Illumina (or GeneMind) style read name.
 *
 * The tile name must be a 4 or 5 digit Illumina tile, see the "Tile Numbering" appendix of the
 * HiSeq X (4 digits) and NextSeq 550 (5 digits) system guides, or a GeneMind field of view
 * `RrrrCccc`, which is numbered `1000 * row + column`.
 *
 * Any name that does not match one of these shapes is an error. An unparseable name means the
 * optical metrics cannot be computed, so callers must not skip it.
 */
pub(crate) fn parse_location(qname: &str) -> Result<PhysicalLocation, Error> {
    let fields: Vec<&str> = qname.split(':').collect();

    let tile_idx = match fields.len() {
        ILLUMINA_READ_NAME_5_FIELDS => ILLUMINA_READ_NAME_5_FIELDS_TILE_FIELD,
        ILLUMINA_READ_NAME_7_FIELDS => ILLUMINA_READ_NAME_7_FIELDS_TILE_FIELD,
        ILLUMINA_READ_NAME_8_FIELDS => ILLUMINA_READ_NAME_8_FIELDS_TILE_FIELD,
        n => {
            return Err(Error::malformed_read_name(
                qname,
                format!("expected 5, 7, or 8 fields separated by ':', found {}", n),
            ))
        }
    };

    let mut location = PhysicalLocation {
        lane: fields[tile_idx - 1].to_string(),
        tile_name: fields[tile_idx].to_string(),
        ..Default::default()
    };

    location.x = fields[tile_idx + 1].parse::<i32>().map_err(|err| {
        Error::malformed_read_name(qname, format!("could not convert x to integer: {}", err))
    })?;
    location.y = fields[tile_idx + 2].parse::<i32>().map_err(|err| {
        Error::malformed_read_name(qname, format!("could not convert y to integer: {}", err))
    })?;

    let tile_name = location.tile_name.as_str();

    if tile_name.len() == GENEMIND_TILE_NAME_LEN
        && tile_name.starts_with('R')
        && tile_name.contains('C')
    {
        let row = tile_name.get(1..4).and_then(|s| s.parse::<i32>().ok());
        let col = tile_name.get(5..).and_then(|s| s.parse::<i32>().ok());

        match (row, col) {
            (Some(row), Some(col)) => location.tile_number = 1000 * row + col,
            _ => {
                return Err(Error::malformed_read_name(
                    qname,
                    format!("could not parse GeneMind field of view {}", tile_name),
                ))
            }
        }
    } else {
        match tile_name.parse::<u32>() {
            Ok(tile) if tile < 100_000 => {
                if tile > 9999 {
                    location.surface = (tile / 10000).to_string();
                    location.swath = ((tile % 10000) / 1000).to_string();
                    location.section = ((tile % 1000) / 100).to_string();
                } else {
                    location.surface = (tile / 1000).to_string();
                    location.swath = ((tile % 1000) / 100).to_string();
                }
                location.tile_number = (tile % 100) as i32;
            }
            _ => {
                return Err(Error::malformed_read_name(
                    qname,
                    format!("unexpected tile name {}, expected 4 or 5 digits", tile_name),
                ))
            }
        }
    }

    Ok(location)
}
