use std::fmt::{Display, Formatter};

use gdal::spatial_ref::{AxisMappingStrategy, SpatialRef};

use crate::errors::Result;

/// A coordinate reference system.
///
/// Axis order is always forced to the traditional GIS `(x, y)` / `(lon, lat)`
/// order so that coordinates handed to and returned by this crate never swap.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    srs: SpatialRef,
}

/// Anything accepted where a CRS is expected.
#[derive(Debug, Clone, PartialEq)]
pub enum CrsSpec {
    Epsg(u32),
    /// WKT, PROJ string, `EPSG:xxxx` or any other definition GDAL understands.
    Definition(String),
    Crs(Crs),
}

impl From<u32> for CrsSpec {
    fn from(code: u32) -> Self {
        CrsSpec::Epsg(code)
    }
}

impl From<&str> for CrsSpec {
    fn from(definition: &str) -> Self {
        CrsSpec::Definition(definition.to_string())
    }
}

impl From<String> for CrsSpec {
    fn from(definition: String) -> Self {
        CrsSpec::Definition(definition)
    }
}

impl From<Crs> for CrsSpec {
    fn from(crs: Crs) -> Self {
        CrsSpec::Crs(crs)
    }
}

impl From<&Crs> for CrsSpec {
    fn from(crs: &Crs) -> Self {
        CrsSpec::Crs(crs.clone())
    }
}

impl TryFrom<CrsSpec> for Crs {
    type Error = crate::errors::Error;

    fn try_from(spec: CrsSpec) -> Result<Self> {
        match spec {
            CrsSpec::Epsg(code) => Crs::from_epsg(code),
            CrsSpec::Definition(definition) => Crs::from_user_input(&definition),
            CrsSpec::Crs(crs) => Ok(crs),
        }
    }
}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Self> {
        Ok(Self::from_spatial_ref(SpatialRef::from_epsg(code)?))
    }

    pub fn from_user_input(definition: &str) -> Result<Self> {
        Ok(Self::from_spatial_ref(SpatialRef::from_definition(
            definition,
        )?))
    }

    pub fn from_spatial_ref(mut srs: SpatialRef) -> Self {
        srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Self { srs }
    }

    pub fn spatial_ref(&self) -> &SpatialRef {
        &self.srs
    }

    pub fn to_wkt(&self) -> Result<String> {
        Ok(self.srs.to_wkt()?)
    }

    /// EPSG code, if the definition carries an EPSG authority.
    pub fn to_epsg(&self) -> Option<u32> {
        match self.srs.auth_name() {
            Some(name) if name.eq_ignore_ascii_case("EPSG") => {
                self.srs.auth_code().ok().and_then(|c| u32::try_from(c).ok())
            }
            _ => None,
        }
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_epsg() {
            Some(code) => write!(f, "EPSG:{code}"),
            None => write!(f, "{}", self.to_wkt().unwrap_or_default()),
        }
    }
}
