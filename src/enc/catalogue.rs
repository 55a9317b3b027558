// S-57 Object Catalogue
// Object class and attribute codes used by the ENC loader
// Codes follow the S-57 object catalogue; inland (I_) codes follow the
// Inland ENC feature catalogue extension ranges

/// S-57 object class codes (OBJL)
pub mod object_codes {
    pub const ACHBRT: u16 = 3;   // Anchor berth
    pub const ACHARE: u16 = 4;   // Anchorage area
    pub const BCNISD: u16 = 6;   // Beacon, isolated danger
    pub const BCNLAT: u16 = 7;   // Beacon, lateral
    pub const BCNSAW: u16 = 8;   // Beacon, safe water
    pub const BCNSPP: u16 = 9;   // Beacon, special purpose
    pub const BUISGL: u16 = 12;  // Building, single
    pub const BUAARE: u16 = 13;  // Built-up area
    pub const BOYCAR: u16 = 14;  // Buoy, cardinal
    pub const BOYINB: u16 = 15;  // Buoy, installation
    pub const BOYISD: u16 = 16;  // Buoy, isolated danger
    pub const BOYLAT: u16 = 17;  // Buoy, lateral
    pub const BOYSAW: u16 = 18;  // Buoy, safe water
    pub const BOYSPP: u16 = 19;  // Buoy, special purpose
    pub const CGUSTA: u16 = 29;  // Coastguard station
    pub const COALNE: u16 = 30;  // Coastline
    pub const CRANES: u16 = 35;  // Crane
    pub const CURENT: u16 = 36;  // Current - non-gravitational
    pub const DEPARE: u16 = 42;  // Depth area
    pub const DEPCNT: u16 = 43;  // Depth contour
    pub const FOGSIG: u16 = 58;  // Fog signal
    pub const HRBFAC: u16 = 64;  // Harbour facility
    pub const LNDARE: u16 = 71;  // Land area
    pub const LNDELV: u16 = 72;  // Land elevation
    pub const LNDMRK: u16 = 74;  // Landmark
    pub const LIGHTS: u16 = 75;  // Light
    pub const MARCUL: u16 = 82;  // Marine farm/culture
    pub const MORFAC: u16 = 84;  // Mooring/warping facility
    pub const OBSTRN: u16 = 86;  // Obstruction
    pub const OFSPLF: u16 = 87;  // Offshore platform
    pub const PILPNT: u16 = 90;  // Pile
    pub const PILBOP: u16 = 91;  // Pilot boarding place
    pub const PYLONS: u16 = 98;  // Pylon/bridge support
    pub const RADSTA: u16 = 102; // Radar station
    pub const RTPBCN: u16 = 103; // Radar transponder beacon
    pub const RDOCAL: u16 = 104; // Radio calling-in point
    pub const RDOSTA: u16 = 105; // Radio station
    pub const RCRTCL: u16 = 108; // Recommended route centreline
    pub const RECTRC: u16 = 109; // Recommended track
    pub const RSCSTA: u16 = 111; // Rescue station
    pub const RESARE: u16 = 112; // Restricted area
    pub const SLCONS: u16 = 122; // Shoreline construction
    pub const SISTAT: u16 = 123; // Signal station, traffic
    pub const SILTNK: u16 = 125; // Silo/tank
    pub const SMCFAC: u16 = 128; // Small craft facility
    pub const SOUNDG: u16 = 129; // Sounding
    pub const TSSLPT: u16 = 148; // Traffic separation scheme lane part
    pub const UWTROC: u16 = 153; // Underwater/awash rock
    pub const WATTUR: u16 = 156; // Water turbulence
    pub const WRECKS: u16 = 159; // Wreck

    // Inland ENC extensions
    pub const I_ACHBRT: u16 = 17000; // Anchor berth (inland)
    pub const I_ACHARE: u16 = 17001; // Anchorage area (inland)
    pub const I_DISMAR: u16 = 17004; // Distance mark
    pub const I_RESARE: u16 = 17005; // Restricted area (inland)
    pub const I_SISTAT: u16 = 17007; // Signal station, traffic (inland)
    pub const I_BERTHS: u16 = 17010; // Berth (inland)
    pub const I_HRBFAC: u16 = 17015; // Harbour facility (inland)
    pub const I_RDOCAL: u16 = 17017; // Radio calling-in point (inland)
    pub const I_BCNLAT: u16 = 17024; // Beacon, lateral (inland)
    pub const I_BOYLAT: u16 = 17025; // Buoy, lateral (inland)
    pub const I_CRANES: u16 = 17029; // Crane (inland)
    pub const I_TRNBSN: u16 = 17034; // Turning basin
    pub const I_WTWGAG: u16 = 17036; // Waterway gauge
}

/// S-57 attribute codes (ATTL)
pub mod attribute_codes {
    pub const CATACH: u16 = 8;   // Category of anchorage
    pub const CATBUA: u16 = 10;  // Category of built-up area
    pub const CATDIS: u16 = 21;  // Category of distance mark
    pub const CATHAF: u16 = 30;  // Category of harbour facility
    pub const CATLMK: u16 = 35;  // Category of landmark
    pub const CATMFA: u16 = 38;  // Category of marine farm/culture
    pub const CATMOR: u16 = 40;  // Category of mooring/warping facility
    pub const CATTRK: u16 = 54;  // Category of recommended track
    pub const CATREA: u16 = 56;  // Category of restricted area
    pub const CATSIT: u16 = 61;  // Category of signal station, traffic
    pub const CATSCF: u16 = 65;  // Category of small craft facility
    pub const CATWAT: u16 = 69;  // Category of water turbulence
    pub const CATWRK: u16 = 71;  // Category of wreck
    pub const COMCHA: u16 = 77;  // Communication channel
    pub const CURVEL: u16 = 84;  // Current velocity
    pub const DRVAL1: u16 = 87;  // Depth range value 1
    pub const ELEVAT: u16 = 90;  // Elevation
    pub const FUNCTN: u16 = 94;  // Function
    pub const OBJNAM: u16 = 116; // Object name
    pub const ORIENT: u16 = 117; // Orientation
    pub const RESTRN: u16 = 131; // Restriction
    pub const VALDCO: u16 = 174; // Value of depth contour
    pub const WATLEV: u16 = 187; // Water level effect

    // Inland ENC extensions
    pub const I_CATACH: u16 = 18002; // Category of anchorage (inland)
    pub const I_CATBRT: u16 = 18005; // Category of berth
    pub const I_CATHAF: u16 = 18011; // Category of harbour facility (inland)
    pub const I_CATSIT: u16 = 18018; // Category of signal station (inland)
    pub const I_HUNITS: u16 = 18024; // Units of distance mark
    pub const I_RESTRN: u16 = 18045; // Restriction (inland)
    pub const I_WTWDIS: u16 = 18053; // Waterway distance
}

use object_codes::*;

/// Object class acronyms for display and export
const OBJECT_ACRONYMS: &[(u16, &str)] = &[
    (ACHBRT, "ACHBRT"),
    (ACHARE, "ACHARE"),
    (BCNISD, "BCNISD"),
    (BCNLAT, "BCNLAT"),
    (BCNSAW, "BCNSAW"),
    (BCNSPP, "BCNSPP"),
    (BUISGL, "BUISGL"),
    (BUAARE, "BUAARE"),
    (BOYCAR, "BOYCAR"),
    (BOYINB, "BOYINB"),
    (BOYISD, "BOYISD"),
    (BOYLAT, "BOYLAT"),
    (BOYSAW, "BOYSAW"),
    (BOYSPP, "BOYSPP"),
    (CGUSTA, "CGUSTA"),
    (COALNE, "COALNE"),
    (CRANES, "CRANES"),
    (CURENT, "CURENT"),
    (DEPARE, "DEPARE"),
    (DEPCNT, "DEPCNT"),
    (FOGSIG, "FOGSIG"),
    (HRBFAC, "HRBFAC"),
    (LNDARE, "LNDARE"),
    (LNDELV, "LNDELV"),
    (LNDMRK, "LNDMRK"),
    (LIGHTS, "LIGHTS"),
    (MARCUL, "MARCUL"),
    (MORFAC, "MORFAC"),
    (OBSTRN, "OBSTRN"),
    (OFSPLF, "OFSPLF"),
    (PILPNT, "PILPNT"),
    (PILBOP, "PILBOP"),
    (PYLONS, "PYLONS"),
    (RADSTA, "RADSTA"),
    (RTPBCN, "RTPBCN"),
    (RDOCAL, "RDOCAL"),
    (RDOSTA, "RDOSTA"),
    (RCRTCL, "RCRTCL"),
    (RECTRC, "RECTRC"),
    (RSCSTA, "RSCSTA"),
    (RESARE, "RESARE"),
    (SLCONS, "SLCONS"),
    (SISTAT, "SISTAT"),
    (SILTNK, "SILTNK"),
    (SMCFAC, "SMCFAC"),
    (SOUNDG, "SOUNDG"),
    (TSSLPT, "TSSLPT"),
    (UWTROC, "UWTROC"),
    (WATTUR, "WATTUR"),
    (WRECKS, "WRECKS"),
    (I_ACHBRT, "achbrt"),
    (I_ACHARE, "achare"),
    (I_DISMAR, "dismar"),
    (I_RESARE, "resare"),
    (I_SISTAT, "sistat"),
    (I_BERTHS, "berths"),
    (I_HRBFAC, "hrbfac"),
    (I_RDOCAL, "rdocal"),
    (I_BCNLAT, "bcnlat"),
    (I_BOYLAT, "boylat"),
    (I_CRANES, "cranes"),
    (I_TRNBSN, "trnbsn"),
    (I_WTWGAG, "wtwgag"),
];

/// Acronym of an object class (inland classes are lower case, as in the
/// Inland ENC catalogue)
pub fn object_acronym(code: u16) -> Option<&'static str> {
    OBJECT_ACRONYMS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, acronym)| *acronym)
}
