// Korean nicknames and shorthand that share no text with the English company name.
// One alias, one ticker: lookups are exact and case-sensitive.
pub(crate) const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("애플", "AAPL"),
    ("마이크로소프트", "MSFT"),
    ("마소", "MSFT"),
    ("구글", "GOOGL"),
    ("알파벳", "GOOGL"),
    ("아마존", "AMZN"),
    ("테슬라", "TSLA"),
    ("엔비디아", "NVDA"),
    ("메타", "META"),
    ("페이스북", "META"),
    ("넷플릭스", "NFLX"),
    ("암드", "AMD"),
    ("인텔", "INTC"),
    ("퀄컴", "QCOM"),
    ("브로드컴", "AVGO"),
    ("암", "ARM"),
    ("텍사스", "TXN"),
    ("마이크론", "MU"),
    ("코카콜라", "KO"),
    ("펩시", "PEP"),
    ("스타벅스", "SBUX"),
    ("맥도날드", "MCD"),
    ("디즈니", "DIS"),
    ("나이키", "NKE"),
    ("존슨앤존슨", "JNJ"),
    ("화이자", "PFE"),
    ("머크", "MRK"),
    ("일라이릴리", "LLY"),
    ("월마트", "WMT"),
    ("코스트코", "COST"),
    ("타겟", "TGT"),
    ("홈디포", "HD"),
    ("JP모건", "JPM"),
    ("뱅크오브아메리카", "BAC"),
    ("비자", "V"),
    ("마스터카드", "MA"),
    ("버크셔해서웨이", "BRK.B"),
    ("버크셔", "BRK.B"),
    ("리얼티인컴", "O"),
    ("월배당", "O"),
    ("아메리칸타워", "AMT"),
    ("팔란티어", "PLTR"),
    ("아이온큐", "IONQ"),
    ("리비안", "RIVN"),
    ("루시드", "LCID"),
    ("TSMC", "TSM"),
    ("게임스탑", "GME"),
    ("반도체", "SOXL"),
    ("반도체 3배", "SOXL"),
    ("나스닥 3배", "TQQQ"),
    ("나스닥", "QQQ"),
    ("제피", "JEPI"),
    ("슈드", "SCHD"),
    ("S&P500", "SPY"),
    ("S&P500 VOO", "VOO"),
];

/// A single-valued alias table.
#[derive(Debug, Clone, Copy)]
pub struct AliasTable<'a> {
    entries: &'a [(&'a str, &'a str)],
}

impl<'a> AliasTable<'a> {
    pub const fn new(entries: &'a [(&'a str, &'a str)]) -> Self {
        Self { entries }
    }

    pub const fn builtin() -> AliasTable<'static> {
        AliasTable::new(BUILTIN_ALIASES)
    }

    pub fn lookup(&self, alias: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == alias)
            .map(|(_, ticker)| *ticker)
    }
}
