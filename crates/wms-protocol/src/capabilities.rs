//! WMS 1.3.0 GetCapabilities document and update-sequence handling.

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use wms_common::time::{parse_iso8601_seconds, seconds_to_iso8601, seconds_to_iso8601_whole};
use wms_common::{CrsCode, DatasetRegistry, WmsError, WmsResult};

use crate::getfeatureinfo::FEATURE_INFO_FORMATS;
use crate::getmap::{
    RequestPolicy, SUPPORTED_EXCEPTION_FORMATS, SUPPORTED_IMAGE_FORMATS, WMS_VERSION,
};

/// Compare a client's UPDATESEQUENCE with the server's last update time.
///
/// Returns `Ok(())` when a fresh document should be sent. Timestamps are
/// compared to the nearest second.
pub fn check_update_sequence(value: &str, last_update_secs: f64) -> WmsResult<()> {
    if value.is_empty() {
        return Ok(());
    }
    let client = parse_iso8601_seconds(value).map_err(|_| {
        WmsError::invalid_parameter("updatesequence", "UPDATESEQUENCE must be a valid ISO8601 date")
    })?;
    if client.round() == last_update_secs.round() {
        return Err(WmsError::CurrentUpdateSequence(value.to_string()));
    }
    if client > last_update_secs {
        return Err(WmsError::InvalidUpdateSequence(value.to_string()));
    }
    Ok(())
}

/// Service description shown in the capabilities document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub title: String,
    pub abstract_text: String,
    /// Comma-separated keywords.
    pub keywords: String,
    pub url: String,
}

/// Builds the capabilities XML from the registry and server settings.
pub struct CapabilitiesBuilder<'a> {
    pub service: &'a ServiceInfo,
    pub policy: &'a RequestPolicy,
    pub registry: &'a DatasetRegistry,
    /// Base URL of the `/wms` endpoint, without a trailing `?`.
    pub endpoint_url: String,
    pub last_update_secs: f64,
}

impl<'a> CapabilitiesBuilder<'a> {
    pub fn build(&self) -> String {
        let mut xml = String::new();
        let service = self.service;
        let endpoint = escape(&self.endpoint_url);
        let online_resource = format!(
            r#"<DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="{}"/></Get></HTTP></DCPType>"#,
            endpoint
        );

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push_str(&format!(
            r#"<WMS_Capabilities version="{}" updateSequence="{}" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
            WMS_VERSION,
            seconds_to_iso8601_whole(self.last_update_secs)
        ));

        // Service
        xml.push_str("<Service><Name>WMS</Name>");
        xml.push_str(&format!("<Title>{}</Title>", escape(&service.title)));
        xml.push_str(&format!("<Abstract>{}</Abstract>", escape(&service.abstract_text)));
        xml.push_str("<KeywordList>");
        for keyword in service.keywords.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            xml.push_str(&format!("<Keyword>{}</Keyword>", escape(keyword)));
        }
        xml.push_str("</KeywordList>");
        xml.push_str(&format!(
            r#"<OnlineResource xlink:type="simple" xlink:href="{}"/>"#,
            escape(&service.url)
        ));
        xml.push_str("<Fees>none</Fees><AccessConstraints>none</AccessConstraints>");
        xml.push_str(&format!(
            "<LayerLimit>{}</LayerLimit><MaxWidth>{}</MaxWidth><MaxHeight>{}</MaxHeight>",
            self.policy.layer_limit,
            self.policy.grid_limits.max_width,
            self.policy.grid_limits.max_height
        ));
        xml.push_str("</Service>");

        // Capability / Request
        xml.push_str("<Capability><Request>");
        xml.push_str(&format!(
            "<GetCapabilities><Format>text/xml</Format>{}</GetCapabilities>",
            online_resource
        ));
        xml.push_str("<GetMap>");
        for format in SUPPORTED_IMAGE_FORMATS {
            xml.push_str(&format!("<Format>{}</Format>", format));
        }
        xml.push_str(&format!("{}</GetMap>", online_resource));
        if self.policy.allow_feature_info {
            xml.push_str("<GetFeatureInfo>");
            for format in FEATURE_INFO_FORMATS {
                xml.push_str(&format!("<Format>{}</Format>", format));
            }
            xml.push_str(&format!("{}</GetFeatureInfo>", online_resource));
        }
        xml.push_str("</Request><Exception>");
        for format in SUPPORTED_EXCEPTION_FORMATS {
            xml.push_str(&format!("<Format>{}</Format>", format));
        }
        xml.push_str("</Exception>");

        // Top-level container layer
        xml.push_str(&format!("<Layer><Title>{}</Title>", escape(&service.title)));
        for crs in CrsCode::ALL {
            xml.push_str(&format!("<CRS>{}</CRS>", crs));
        }
        for dataset in self.registry.iter().filter(|d| d.ready) {
            xml.push_str(&format!("<Layer><Title>{}</Title>", escape(&dataset.title)));
            for var in &dataset.variables {
                self.write_variable_layer(&mut xml, &dataset.id, dataset.queryable, var);
            }
            xml.push_str("</Layer>");
        }
        xml.push_str("</Layer></Capability></WMS_Capabilities>");
        xml
    }

    fn write_variable_layer(
        &self,
        xml: &mut String,
        dataset_id: &str,
        queryable: bool,
        var: &wms_common::Variable,
    ) {
        if self.policy.allow_feature_info && queryable {
            xml.push_str(r#"<Layer queryable="1">"#);
        } else {
            xml.push_str("<Layer>");
        }
        let name = format!("{}{}{}", dataset_id, self.policy.layer_separator, var.id);
        xml.push_str(&format!("<Name>{}</Name>", escape(&name)));
        xml.push_str(&format!("<Title>{}</Title>", escape(&var.title)));
        xml.push_str(&format!("<Abstract>{}</Abstract>", escape(&var.abstract_text)));

        let b = &var.bbox;
        xml.push_str(&format!(
            "<EX_GeographicBoundingBox>\
             <westBoundLongitude>{}</westBoundLongitude>\
             <eastBoundLongitude>{}</eastBoundLongitude>\
             <southBoundLatitude>{}</southBoundLatitude>\
             <northBoundLatitude>{}</northBoundLatitude>\
             </EX_GeographicBoundingBox>",
            b.min_x, b.max_x, b.min_y, b.max_y
        ));
        xml.push_str(&format!(
            r#"<BoundingBox CRS="CRS:84" minx="{:.6}" maxx="{:.6}" miny="{:.6}" maxy="{:.6}"/>"#,
            b.min_x, b.max_x, b.min_y, b.max_y
        ));

        if let Some(zvalues) = var.zvalues.as_ref().filter(|z| !z.is_empty()) {
            let values: Vec<String> = zvalues.iter().map(f64::to_string).collect();
            xml.push_str(&format!(
                r#"<Dimension name="elevation" units="{}" default="{}">{}</Dimension>"#,
                escape(&var.zunits),
                zvalues[0],
                values.join(",")
            ));
        }

        if let Some(&last) = var.tvalues.last() {
            let values: Vec<String> = var.tvalues.iter().map(|&t| seconds_to_iso8601(t)).collect();
            xml.push_str(&format!(
                r#"<Dimension name="time" units="ISO8601" multipleValues="true" current="true" default="{}">{}</Dimension>"#,
                seconds_to_iso8601(last),
                values.join(",")
            ));
        }
        xml.push_str("</Layer>");
    }
}
