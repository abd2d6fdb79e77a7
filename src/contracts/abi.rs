use ethers::prelude::abigen;

// Bindings for the deployed GruposAhorroConAaveMultisig contract. Signatures
// must match the deployment exactly.
abigen!(
    GruposAhorro,
    r#"[
        function crearGrupo(string _nombre, uint256 _objetivo, uint256 _fechaObjetivo, string _descripcion, uint256 _quorum, address[] _aprobadores) external returns (uint256)
        function aportar(uint256 _grupoId) external payable
        function obtenerGrupo(uint256 _grupoId) external view returns (uint256 id, address creador, string nombre, uint256 objetivo, uint256 totalRecaudado, uint256 totalEnAave, uint256 fechaObjetivo, string descripcion, bool activo, bool metaAlcanzada, uint256 quorum)
        function obtenerParticipantes(uint256 _grupoId) external view returns (address[])
        function obtenerAporte(uint256 _grupoId, address _participante) external view returns (uint256)
        function obtenerBalanceTotal(uint256 _grupoId) external view returns (uint256)
        function obtenerGruposPorUsuario(address _usuario) external view returns (uint256[])
        function totalGrupos() external view returns (uint256)
        function solicitarRetiro(uint256 _grupoId, address _destinatario) external returns (uint256)
        function aprobarRetiro(uint256 _grupoId, uint256 _solicitudId) external
        function ejecutarRetiro(uint256 _grupoId, uint256 _solicitudId) external
        function agregarParticipante(uint256 _grupoId, address _participante) external
        event GrupoCreado(uint256 indexed grupoId, address indexed creador, string nombre, uint256 objetivo, uint256 fechaObjetivo, uint256 quorum)
        event AporteRealizado(uint256 indexed grupoId, address indexed participante, uint256 cantidad, uint256 totalRecaudado, uint256 totalEnAave)
        event MetaAlcanzada(uint256 indexed grupoId, uint256 totalRecaudado)
        event SolicitudRetiroCreada(uint256 indexed solicitudId, uint256 indexed grupoId, address indexed solicitante, address destinatario, uint256 cantidad)
        event AprobacionAgregada(uint256 indexed solicitudId, uint256 indexed grupoId, address indexed aprobador, uint256 numAprobaciones, uint256 quorum)
        event RetiroEjecutado(uint256 indexed solicitudId, uint256 indexed grupoId, address indexed destinatario, uint256 cantidad, uint256 interesesGenerados)
        event ParticipanteAgregado(uint256 indexed grupoId, address indexed participante)
    ]"#
);
