use crate::registry::ToolRegistry;
use crate::tool::{ToolCategory, ToolDescriptor};
use cyberops_core::RiskLevel;

/// Register the built-in tool catalog for the stock agent types
/// (`reconnaissance`, `vulnerability`, `threat_intel`).
pub fn register_builtin_catalog(registry: &mut ToolRegistry) {
    for tool in builtin_tools() {
        registry.register(tool);
    }
}

fn builtin_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "nmap",
            "Nmap",
            "Network mapper: host discovery, port scanning and service detection",
            ToolCategory::Discovery,
            RiskLevel::Medium,
        )
        .with_techniques(&["T1046", "T1595.001"])
        .for_agent_types(&["reconnaissance", "vulnerability"]),
        ToolDescriptor::new(
            "amass",
            "OWASP Amass",
            "Passive and active subdomain enumeration",
            ToolCategory::Enumeration,
            RiskLevel::Low,
        )
        .with_techniques(&["T1590.002", "T1596"])
        .for_agent_types(&["reconnaissance"]),
        ToolDescriptor::new(
            "whatweb",
            "WhatWeb",
            "Web technology fingerprinting",
            ToolCategory::Enumeration,
            RiskLevel::Low,
        )
        .with_techniques(&["T1592.002"])
        .for_agent_types(&["reconnaissance"]),
        ToolDescriptor::new(
            "nuclei",
            "Nuclei",
            "Template-based vulnerability scanner",
            ToolCategory::VulnerabilityScanning,
            RiskLevel::Medium,
        )
        .with_techniques(&["T1595.002"])
        .for_agent_types(&["vulnerability"]),
        ToolDescriptor::new(
            "nikto",
            "Nikto",
            "Web server misconfiguration and known-issue scanner",
            ToolCategory::VulnerabilityScanning,
            RiskLevel::Medium,
        )
        .with_techniques(&["T1595.002"])
        .for_agent_types(&["vulnerability"]),
        ToolDescriptor::new(
            "sqlmap",
            "sqlmap",
            "SQL injection detection and exploitation",
            ToolCategory::Exploitation,
            RiskLevel::High,
        )
        .with_techniques(&["T1190"])
        .for_agent_types(&["vulnerability"]),
        ToolDescriptor::new(
            "yara",
            "YARA",
            "Pattern matching over files and memory for malware families",
            ToolCategory::Forensics,
            RiskLevel::Low,
        )
        .with_techniques(&["T1027", "T1204"])
        .for_agent_types(&["threat_intel"]),
        ToolDescriptor::new(
            "misp",
            "MISP lookup",
            "Indicator lookup against a MISP threat-sharing instance",
            ToolCategory::ThreatIntelligence,
            RiskLevel::Low,
        )
        .with_techniques(&["T1588"])
        .for_agent_types(&["threat_intel"]),
        ToolDescriptor::new(
            "virustotal",
            "VirusTotal lookup",
            "Reputation lookup for hashes, domains and addresses",
            ToolCategory::ThreatIntelligence,
            RiskLevel::Low,
        )
        .with_techniques(&["T1588", "T1071"])
        .for_agent_types(&["threat_intel"]),
    ]
}
