// ── Class tables ──
//
// Static knowledge about declaration classes: which are singletons, and
// which are reset to the original baseline when omitted.

/// Classes whose body is one property object rather than a map of named
/// objects. Singletons are compared as a whole and never deleted.
pub const SINGLETON_CLASSES: &[&str] = &[
    "Analytics",
    "Authentication",
    "ConfigSync",
    "DagGlobals",
    "DbVariables",
    "Disk",
    "DNS",
    "FailoverMulticast",
    "FailoverUnicast",
    "GSLBGlobals",
    "HTTPD",
    "License",
    "ManagementIpFirewall",
    "NTP",
    "Provision",
    "SecurityAnalytics",
    "SnmpAgent",
    "SnmpTrapEvents",
    "SSHD",
    "System",
    "TrafficControl",
];

/// Classes that revert to the original device baseline when a declaration
/// leaves them out. An omitted class that is not listed is left exactly as
/// the device currently has it.
pub const CLASSES_OF_TRUTH: &[&str] = &[
    "Analytics",
    "Authentication",
    "ConfigSync",
    "DagGlobals",
    "DbVariables",
    "Disk",
    "DNS",
    "FailoverMulticast",
    "FailoverUnicast",
    "FirewallAddressList",
    "FirewallPolicy",
    "FirewallPortList",
    "GSLBDataCenter",
    "GSLBGlobals",
    "GSLBMonitor",
    "GSLBProberPool",
    "GSLBServer",
    "HTTPD",
    "MAC_Masquerade",
    "ManagementIp",
    "ManagementIpFirewall",
    "ManagementRoute",
    "MirrorIp",
    "NetAddressList",
    "NetPortList",
    "NTP",
    "Provision",
    "RemoteAuthRole",
    "Route",
    "RouteDomain",
    "RouteMap",
    "RoutingAccessList",
    "RoutingAsPath",
    "RoutingBGP",
    "RoutingPrefixList",
    "SecurityAnalytics",
    "SelfIp",
    "SnmpAgent",
    "SnmpCommunity",
    "SnmpTrapDestination",
    "SnmpTrapEvents",
    "SnmpUser",
    "SSHD",
    "System",
    "TrafficControl",
    "Trunk",
    "Tunnel",
    "VLAN",
];

/// `true` for nameless classes. Unknown classes are treated as named.
pub fn is_singleton(class: &str) -> bool {
    SINGLETON_CLASSES.contains(&class)
}
